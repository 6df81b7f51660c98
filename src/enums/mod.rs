mod method;
mod status;

pub use self::method::{Method, MethodMask, IntoMethodMask};
pub use self::status::{Status, Version};
