/// External collaborators: opaque host tooling the sweep drives but does not
/// own. Each is probed before use; a missing tool makes its step a silent
/// no-op and a failing one is a warning, never fatal.
pub mod backup;
pub mod packages;
pub mod services;

pub use backup::BackupExporter;
pub use packages::PackageManager;
pub use services::ServiceSupervisor;
