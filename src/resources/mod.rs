pub mod classpath;
pub mod stager;
pub mod store;
