//! Basic usage example for cos-client
//!
//! Reads credentials from the environment (COS_SECRET_ID, COS_SECRET_KEY,
//! COS_APP_ID, COS_REGION) and walks through bucket and object operations.
//!
//! Run with:
//! ```
//! RUST_LOG=cos_client=debug cargo run --example basic_usage
//! ```

use bytes::Bytes;
use cos_client::config;
use cos_client::cos::{CosClient, CosError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::load_config(None, None)?;
    let profile = config
        .get_profile(None)
        .ok_or_else(|| anyhow::anyhow!("No profile found in configuration"))?;
    let client = CosClient::new(profile.to_client_config())?;

    println!("cos-client - Basic Usage Example");
    println!("================================\n");

    // Example 1: List buckets
    println!("1. Listing buckets...");
    let listing = client.list_buckets().await?;
    for bucket in &listing.buckets {
        println!("   {} (app {}) in {}", bucket.name, bucket.app_id, bucket.region);
    }
    println!();

    // Example 2: Create bucket (tolerate an existing one)
    println!("2. Creating bucket...");
    match client.create_bucket("example").await {
        Ok(()) => println!("   Created\n"),
        Err(CosError::Service(err)) if err.error_code == "BucketAlreadyOwnedByYou" => {
            println!("   Already exists\n")
        }
        Err(err) => return Err(err.into()),
    }

    // Example 3: Put object
    println!("3. Uploading object...");
    let output = client
        .put_object("example", "test/example.txt", Bytes::from_static(b"Hello, COS!"))
        .await?;
    println!("   Uploaded with ETag: {:?}\n", output.etag);

    // Example 4: Get object
    println!("4. Downloading object...");
    let data = client.get_object("example", "test/example.txt").await?;
    println!("   Downloaded {} bytes", data.len());
    println!("   Content: {}\n", String::from_utf8_lossy(&data));

    // Example 5: Delete object and bucket
    println!("5. Cleaning up...");
    client.delete_object("example", "test/example.txt").await?;
    client.delete_bucket("example").await?;
    println!("   Done");

    Ok(())
}
