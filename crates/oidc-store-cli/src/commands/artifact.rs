use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use oidc_store::GrantRevoker;
use serde_json::{Map, Value};

use crate::cli::{ArtifactArgs, RevokeArgs, UpsertArgs};
use crate::context::Context;
use crate::output::{print_info, print_success, print_value};

pub async fn upsert(ctx: &Context, args: &UpsertArgs) -> Result<()> {
    let payload = read_payload(args.payload.as_deref(), args.file.as_deref())?;
    ctx.factory
        .for_kind(&args.kind)
        .upsert(&args.id, payload, args.ttl)
        .await?;
    print_success(&format!("Stored {}/{}", args.kind, args.id));
    Ok(())
}

pub async fn find(ctx: &Context, args: &ArtifactArgs) -> Result<()> {
    match ctx.factory.for_kind(&args.kind).find(&args.id).await? {
        Some(artifact) => print_value(&artifact)?,
        None => print_info(&format!("{}/{} not found", args.kind, args.id)),
    }
    Ok(())
}

pub async fn consume(ctx: &Context, args: &ArtifactArgs) -> Result<()> {
    ctx.factory
        .for_kind(&args.kind)
        .consume(&args.id)
        .await?;
    print_success(&format!("Consumed {}/{}", args.kind, args.id));
    Ok(())
}

pub async fn destroy(ctx: &Context, args: &ArtifactArgs) -> Result<()> {
    ctx.factory
        .for_kind(&args.kind)
        .destroy(&args.id)
        .await?;
    print_success(&format!("Destroyed {}/{}", args.kind, args.id));
    Ok(())
}

pub async fn revoke(ctx: &Context, args: &RevokeArgs) -> Result<()> {
    let report = ctx.factory.revocation().revoke(&args.grant_id).await?;
    print_value(&report)?;
    Ok(())
}

fn read_payload(inline: Option<&str>, file: Option<&Path>) -> Result<Map<String, Value>> {
    let raw = match (inline, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Cannot read payload file {}", path.display()))?,
        (None, None) => return Ok(Map::new()),
    };

    match serde_json::from_str::<Value>(&raw).context("Payload is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Payload must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_payload() {
        let payload = read_payload(Some(r#"{"grantId": "G1"}"#), None).unwrap();
        assert_eq!(payload["grantId"], "G1");

        assert!(read_payload(None, None).unwrap().is_empty());
        assert!(read_payload(Some("[1, 2]"), None).is_err());
        assert!(read_payload(Some("{"), None).is_err());
    }
}
