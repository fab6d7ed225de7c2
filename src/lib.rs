//! Client for EC2-style query APIs: signed form POSTs in, XML out.
//!
//! ```rust,no_run
//! use swirl::{create_ec2_client, CallParams, ParamValue};
//!
//! # async fn example() -> Result<(), swirl::QueryError> {
//! let client = create_ec2_client("AKIDEXAMPLE".to_string(), "secret".to_string())?;
//!
//! let mut params = CallParams::new();
//! params.insert("InstanceId".to_string(), ParamValue::from(vec!["i-1a2b3c4d"]));
//!
//! let result = client.call("DescribeInstances", params).await?;
//! let reservations = &result["DescribeInstancesResponse"]["reservationSet"];
//! println!("{} reservations", reservations.as_array().map_or(0, Vec::len));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod ec2;

pub use crate::core::{
    config::ClientConfig,
    errors::QueryError,
    traits::QueryApi,
    types::{CallParams, ExpandedParams, ParamValue},
};
pub use ec2::{create_ec2_client, Ec2Builder, Ec2Client};
