pub mod db;
pub mod leaddb;
pub mod profiledb;
pub mod propertydb;
