pub mod completions;
pub mod doctor;
pub mod new;
pub mod option;
pub mod run;
pub mod telemetry;
pub mod theme;
pub mod validate;
