use std::sync::Arc;

use anyhow::{Result, ensure};
use oidc_store::{
    Account, AccountLookup, GrantRevoked, RevocationListener, StaticAccounts, TableConfig,
};
use oidc_store_memory::MemoryBackend;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::context::{BackendHandle, Context};
use crate::output::{print_info, print_success, print_value};

const DEMO_ACCOUNT: &str = "demo-user";

/// Runs an authorization code flow against a fresh in-memory backend, then
/// revokes the grant through the revocation listener.
pub async fn run() -> Result<()> {
    let ctx = Context::with_backend(
        BackendHandle::Memory(Arc::new(MemoryBackend::new())),
        TableConfig::with_prefix("demo_"),
    )?;
    let accounts = StaticAccounts::new().with_account(
        Account::new(DEMO_ACCOUNT)
            .with_claim("email", "demo@example.com")
            .with_claim("email_verified", true),
    );

    let grant = Uuid::new_v4().to_string();
    let other_grant = Uuid::new_v4().to_string();
    print_info(&format!("Grant {grant}"));

    let sessions = ctx.factory.for_kind("Session");
    let codes = ctx.factory.for_kind("AuthorizationCode");
    let access = ctx.factory.for_kind("AccessToken");
    let refresh = ctx.factory.for_kind("RefreshToken");

    sessions
        .upsert("session-1", object(json!({"account": DEMO_ACCOUNT})), Some(3_600))
        .await?;
    codes
        .upsert(
            "code-1",
            object(json!({"grantId": grant, "accountId": DEMO_ACCOUNT, "scope": "openid email"})),
            Some(600),
        )
        .await?;
    print_success("Issued authorization code");

    codes.consume("code-1").await?;
    print_success("Redeemed authorization code");

    access
        .upsert("access-1", object(json!({"grantId": grant})), Some(3_600))
        .await?;
    refresh
        .upsert("refresh-1", object(json!({"grantId": grant})), Some(86_400))
        .await?;
    access
        .upsert("access-2", object(json!({"grantId": other_grant})), Some(3_600))
        .await?;
    print_success("Issued access and refresh tokens");

    if let Some(account) = accounts.find_by_id(DEMO_ACCOUNT).await? {
        print_value(&Value::Object(account.claims_for(&["openid", "email"])))?;
    }

    let listener = RevocationListener::spawn(ctx.factory.revocation());
    listener.sender().send(GrantRevoked::new(&grant)).await?;
    let stats = listener.shutdown().await;
    ensure!(stats.failed == 0, "Revocation of grant {grant} failed");
    print_success("Revoked grant");

    ensure!(codes.find("code-1").await?.is_none(), "code-1 survived revocation");
    ensure!(access.find("access-1").await?.is_none(), "access-1 survived revocation");
    ensure!(refresh.find("refresh-1").await?.is_none(), "refresh-1 survived revocation");
    ensure!(access.find("access-2").await?.is_some(), "access-2 was revoked");
    ensure!(sessions.find("session-1").await?.is_some(), "session-1 was revoked");
    print_success("Only artifacts of the revoked grant are gone");

    Ok(())
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
