pub mod children;
pub mod create;
pub mod delete;
pub mod describe;
pub mod diff;
pub mod dump;
pub mod get;
pub mod list;
pub mod load;
pub mod set;
pub mod validate;

pub use children::children_command;
pub use create::create_command;
pub use delete::delete_command;
pub use describe::describe_command;
pub use diff::diff_command;
pub use dump::dump_command;
pub use get::get_command;
pub use list::list_command;
pub use load::load_command;
pub use set::set_command;
pub use validate::validate_command;
