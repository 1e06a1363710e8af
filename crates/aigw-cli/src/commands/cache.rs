//! Cache administration

use aigw_core::Gateway;

pub async fn flush(gateway: &Gateway) -> anyhow::Result<()> {
    let before = gateway.cache_statistics().await?;
    gateway.flush_cache().await?;
    println!("Flushed {} cached response(s)", before.entry_count);
    Ok(())
}
