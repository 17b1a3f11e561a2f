pub mod functiondtos;
pub mod leaddtos;
pub mod propertydtos;
pub mod uploaddtos;
pub mod userdtos;
