pub mod house;
pub mod member;
pub mod reading;

pub use house::{BillingCycleStart, House, HouseConfig, NewHouse};
pub use member::{JoinRequest, JoinRequestStatus, User};
pub use reading::{NewReading, Reading};
