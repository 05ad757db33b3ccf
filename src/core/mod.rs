pub mod assertions;
pub mod engine;
pub mod image;
pub mod inspect;
pub mod os;
pub mod report;
pub mod session;
pub mod suite;
pub mod verifier;

pub use assertions::Assertion;
pub use engine::{ContainerEngine, DockerCli};
pub use image::{ImageHandle, ImageSpec, InstanceHandle};
pub use inspect::{InspectionResult, assert_contains};
pub use os::{OsFamily, OsInspector};
pub use report::{AssertionFailure, CheckOutcome, CheckReport, CheckStatus, SuiteReport};
pub use session::Session;
pub use suite::{Check, Suite};
pub use verifier::Verifier;
