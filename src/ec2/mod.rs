pub mod builder;
pub mod client;

// Re-export main components
pub use builder::{create_ec2_client, create_ec2_client_from_env, Ec2Builder};
pub use client::Ec2Client;
