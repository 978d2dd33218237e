mod controller;
mod shutdown;
mod startup;
mod transitions;


pub use controller::{LifecycleController, LifecycleOptions};
