pub mod csl;
pub mod general;
pub mod request;
pub mod response;
