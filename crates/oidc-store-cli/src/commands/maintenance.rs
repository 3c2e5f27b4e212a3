use anyhow::Result;

use crate::context::{BackendHandle, Context};
use crate::output::{print_info, print_success};

pub async fn schema(ctx: &Context) -> Result<()> {
    match &ctx.backend {
        BackendHandle::Postgres(backend) => {
            backend.ensure_schema(ctx.tables()).await?;
            print_success("Schema is up to date");
        }
        BackendHandle::Memory(_) => print_info("The memory backend has no schema"),
    }
    Ok(())
}

pub async fn cleanup(ctx: &Context) -> Result<()> {
    let now = ctx.clock.now();
    let removed = match &ctx.backend {
        BackendHandle::Postgres(backend) => backend.cleanup_expired(ctx.tables(), now).await?,
        BackendHandle::Memory(backend) => backend.purge_expired(now),
    };
    print_success(&format!("Removed {removed} expired artifacts"));
    Ok(())
}
