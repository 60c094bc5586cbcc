pub mod driver;
pub mod event;
pub mod js_report;
