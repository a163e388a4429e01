pub mod add;
pub mod archive;
pub mod delete;
pub mod r#do;
pub mod edit;
pub mod list;
pub mod project;
pub mod recurrence;
pub mod section;
pub mod start;
