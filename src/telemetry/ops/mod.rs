pub mod run;
pub mod cache;
pub mod canon;
