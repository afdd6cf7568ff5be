pub mod alert;
pub mod alert_trigger;
pub mod issue;
pub mod metric;
pub mod recommendation;
pub mod scan;
pub mod subscription;
pub mod website;
