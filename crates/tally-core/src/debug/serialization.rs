// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Finding which member of a dependency graph fails to serialize.
//!
//! When serializing a finished task record fails, the reporting layer can hand
//! the offending object to [`diagnose_serialization`]. It tries each direct
//! dependency in turn and names the first one that fails; if they all succeed,
//! the parent itself is at fault.

use serde::Serialize;
use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};

/// An object that can be test-serialized and knows its direct dependencies.
pub trait SerializationCheck {
    /// A human-readable name for reports.
    fn describe(&self) -> String;

    /// Attempts to serialize this object on its own.
    fn try_serialize(&self) -> Result<(), String>;

    /// The objects this one directly references.
    fn dependencies(&self) -> Vec<&dyn SerializationCheck>;
}

/// Attempts to serialize `value` to JSON, discarding the output.
///
/// Handy as the body of [`SerializationCheck::try_serialize`].
pub fn check_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    serde_json::to_vec(value).map(|_| ()).map_err(|e| e.to_string())
}

/// The outcome of [`diagnose_serialization`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationDiagnosis {
    /// A direct dependency failed to serialize.
    DependencyFailed {
        /// The parent whose dependency failed.
        parent: String,
        /// The first failing dependency.
        dependency: String,
        /// The error it reported.
        reason: String,
    },
    /// All dependencies serialize, so the parent itself is at fault.
    ParentFailed {
        /// The parent that failed.
        parent: String,
    },
}

impl Display for SerializationDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationDiagnosis::DependencyFailed {
                parent,
                dependency,
                reason,
            } => write!(
                f,
                "Dependency {dependency} of {parent} failed to serialize: {reason}"
            ),
            SerializationDiagnosis::ParentFailed { parent } => write!(
                f,
                "Dependencies of {parent} serialize fine, but {parent} itself does not"
            ),
        }
    }
}

/// Name used when an object's `describe` panics.
const UNNAMED: &str = "<unnamed>";

fn guarded_serialize(node: &dyn SerializationCheck) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| node.try_serialize()))
        .unwrap_or_else(|_| Err("serializer panicked".to_string()))
}

fn guarded_describe(node: &dyn SerializationCheck) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| node.describe())).unwrap_or_else(|_| {
        log::debug!("describe panicked during serialization diagnosis");
        UNNAMED.to_string()
    })
}

/// Classifies a serialization failure of `parent`.
///
/// Never fails or panics: a panic from any trait method is caught. A node
/// whose `describe` panics is reported as `<unnamed>`, and a parent whose
/// `dependencies` panics is blamed itself.
pub fn diagnose_serialization(parent: &dyn SerializationCheck) -> SerializationDiagnosis {
    let parent_name = guarded_describe(parent);
    let dependencies = match panic::catch_unwind(AssertUnwindSafe(|| parent.dependencies())) {
        Ok(dependencies) => dependencies,
        Err(_) => {
            log::debug!("dependencies of {parent_name} panicked");
            Vec::new()
        }
    };
    for dependency in dependencies {
        if let Err(reason) = guarded_serialize(dependency) {
            let diagnosis = SerializationDiagnosis::DependencyFailed {
                parent: parent_name,
                dependency: guarded_describe(dependency),
                reason,
            };
            log::warn!("{diagnosis}");
            return diagnosis;
        }
    }
    let diagnosis = SerializationDiagnosis::ParentFailed {
        parent: parent_name,
    };
    log::warn!("{diagnosis}");
    diagnosis
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};

    struct Leaf {
        name: &'static str,
        ok: bool,
    }

    impl Serialize for Leaf {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.ok {
                serializer.serialize_str(self.name)
            } else {
                Err(S::Error::custom(format!("{} holds a live file handle", self.name)))
            }
        }
    }

    impl SerializationCheck for Leaf {
        fn describe(&self) -> String {
            self.name.to_string()
        }
        fn try_serialize(&self) -> Result<(), String> {
            check_json(self)
        }
        fn dependencies(&self) -> Vec<&dyn SerializationCheck> {
            Vec::new()
        }
    }

    struct Stage {
        deps: Vec<Leaf>,
    }

    impl SerializationCheck for Stage {
        fn describe(&self) -> String {
            "stage-1".to_string()
        }
        fn try_serialize(&self) -> Result<(), String> {
            Err("stage closure captured a socket".to_string())
        }
        fn dependencies(&self) -> Vec<&dyn SerializationCheck> {
            self.deps.iter().map(|d| d as &dyn SerializationCheck).collect()
        }
    }

    struct Panicking;

    impl SerializationCheck for Panicking {
        fn describe(&self) -> String {
            "panicking".to_string()
        }
        fn try_serialize(&self) -> Result<(), String> {
            panic!("serializer bug")
        }
        fn dependencies(&self) -> Vec<&dyn SerializationCheck> {
            Vec::new()
        }
    }

    struct Wrapper(Panicking);

    impl SerializationCheck for Wrapper {
        fn describe(&self) -> String {
            "wrapper".to_string()
        }
        fn try_serialize(&self) -> Result<(), String> {
            Err("nested".to_string())
        }
        fn dependencies(&self) -> Vec<&dyn SerializationCheck> {
            vec![&self.0 as &dyn SerializationCheck]
        }
    }

    /// Panics from whichever trait methods are flagged.
    struct Faulty {
        describe_panics: bool,
        dependencies_panic: bool,
        child: Option<Box<Faulty>>,
    }

    impl SerializationCheck for Faulty {
        fn describe(&self) -> String {
            if self.describe_panics {
                panic!("describe bug");
            }
            "faulty".to_string()
        }
        fn try_serialize(&self) -> Result<(), String> {
            Err("not serializable".to_string())
        }
        fn dependencies(&self) -> Vec<&dyn SerializationCheck> {
            if self.dependencies_panic {
                panic!("dependencies bug");
            }
            self.child
                .iter()
                .map(|c| c.as_ref() as &dyn SerializationCheck)
                .collect()
        }
    }

    #[test]
    fn test_reports_first_failing_dependency() {
        let stage = Stage {
            deps: vec![
                Leaf { name: "shuffle-0", ok: true },
                Leaf { name: "broadcast-3", ok: false },
                Leaf { name: "shuffle-4", ok: false },
            ],
        };
        let diagnosis = diagnose_serialization(&stage);
        match &diagnosis {
            SerializationDiagnosis::DependencyFailed {
                dependency, reason, ..
            } => {
                assert_eq!(dependency, "broadcast-3");
                assert!(reason.contains("live file handle"));
            }
            other => panic!("unexpected diagnosis: {other:?}"),
        }
        assert!(diagnosis.to_string().starts_with("Dependency broadcast-3 of stage-1"));
    }

    #[test]
    fn test_blames_parent_when_dependencies_are_fine() {
        let stage = Stage {
            deps: vec![Leaf { name: "shuffle-0", ok: true }],
        };
        let diagnosis = diagnose_serialization(&stage);
        assert_eq!(
            diagnosis,
            SerializationDiagnosis::ParentFailed {
                parent: "stage-1".to_string()
            }
        );
        assert_eq!(
            diagnosis.to_string(),
            "Dependencies of stage-1 serialize fine, but stage-1 itself does not"
        );
    }

    #[test]
    fn test_panicking_dependency_is_reported_not_propagated() {
        let diagnosis = diagnose_serialization(&Wrapper(Panicking));
        assert_eq!(
            diagnosis,
            SerializationDiagnosis::DependencyFailed {
                parent: "wrapper".to_string(),
                dependency: "panicking".to_string(),
                reason: "serializer panicked".to_string(),
            }
        );
    }

    #[test]
    fn test_panicking_describe_falls_back_to_placeholder() {
        let parent = Faulty {
            describe_panics: true,
            dependencies_panic: false,
            child: Some(Box::new(Faulty {
                describe_panics: true,
                dependencies_panic: false,
                child: None,
            })),
        };
        assert_eq!(
            diagnose_serialization(&parent),
            SerializationDiagnosis::DependencyFailed {
                parent: "<unnamed>".to_string(),
                dependency: "<unnamed>".to_string(),
                reason: "not serializable".to_string(),
            }
        );
    }

    #[test]
    fn test_panicking_dependencies_blames_parent() {
        let parent = Faulty {
            describe_panics: false,
            dependencies_panic: true,
            child: None,
        };
        assert_eq!(
            diagnose_serialization(&parent),
            SerializationDiagnosis::ParentFailed {
                parent: "faulty".to_string()
            }
        );
    }
}
