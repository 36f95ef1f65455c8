// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Update tests using the client [DeviceHandle]

use log::{debug, info};

use ota_client::{
    image::{compress, DEFAULT_LEVEL},
    DeviceHandle, Error, Exchange, UpdateOptions, UpdateReport,
};
use ota_proto::OtaError;

use crate::vectors::Vector;

/// Install a vector image, checking the update report
pub async fn test_update<T>(
    h: &DeviceHandle<T>,
    v: &Vector,
    chunk_size: usize,
) -> anyhow::Result<UpdateReport>
where
    T: Exchange + Send + Sync,
{
    let image = v.image();
    let opts = UpdateOptions {
        chunk_size,
        level: DEFAULT_LEVEL,
    };

    info!("Installing version {} ({} bytes)", v.version, v.size);

    let r = h.update(&image, &opts).await?;

    debug!("Update report: {:?}", r);

    let compressed = compress(&image, DEFAULT_LEVEL)?;

    anyhow::ensure!(r.image.version == v.version, "version mismatch");
    anyhow::ensure!(r.image.size == v.size, "size mismatch");
    anyhow::ensure!(
        r.compressed_size == compressed.len(),
        "compressed size mismatch"
    );
    anyhow::ensure!(
        r.chunks == (compressed.len() + chunk_size - 1) / chunk_size,
        "unexpected chunk count {}",
        r.chunks
    );

    Ok(r)
}

/// Attempt to install a vector image, expecting the device to fail
/// the update with `expected`
pub async fn test_rejected<T>(
    h: &DeviceHandle<T>,
    v: &Vector,
    expected: OtaError,
) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
{
    info!("Installing version {}, expecting {}", v.version, expected);

    match h.update(&v.image(), &UpdateOptions::default()).await {
        Err(Error::Update(e)) if e == expected => Ok(()),
        r => Err(anyhow::anyhow!(
            "Unexpected result: {:?} (expected {})",
            r,
            expected
        )),
    }
}
