pub mod decision;
pub mod level;
pub mod policy;

pub use decision::Decision;
pub use decision::DenyReason;
pub use level::SecurityLevel;
pub use policy::SecurityPolicy;
pub use policy::command_name;
pub use policy::decide;
