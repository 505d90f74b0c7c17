mod panic;

pub use self::panic::catch_panic;
