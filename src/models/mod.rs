pub mod leadmodel;
pub mod profilemodel;
pub mod propertymodel;
