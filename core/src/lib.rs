//! Services the Aurora UI talks to: the policy-guarded terminal and the AI
//! assistant, plus the config file that wires them up.

pub mod assistant;
pub mod config;
pub mod response_parser;
pub mod terminal;

pub use assistant::AssistantError;
pub use assistant::AssistantService;
pub use config::Config;
pub use config::ConfigError;
pub use config::TerminalConfig;
pub use config::find_aurora_home;
pub use response_parser::ParseError;
pub use response_parser::extract_json_object;
pub use response_parser::extract_structured;
pub use terminal::Started;
pub use terminal::TerminalService;
