//! `AssetContract`: create, read, update, and delete over approval assets.
//!
//! Each mutation emits exactly one event named after the function, carrying
//! the JSON-serialized asset. Write paths check existence first and then act;
//! the hosting platform serializes conflicting transactions on the same key.

use crate::context::TransactionContext;
use chainperm_core::{asset::Asset, error::ContractError, event::EventKind};
use tracing::debug;

/// The asset-store chaincode.
#[derive(Debug, Clone, Default)]
pub struct AssetContract;

impl AssetContract {
    pub fn new() -> Self {
        Self
    }

    /// Create a new asset. Fails with `AlreadyExists` if `id` is present.
    pub fn create_asset(
        &self,
        ctx: &mut dyn TransactionContext,
        id: &str,
        approvement: bool,
        approver: &str,
    ) -> Result<(), ContractError> {
        if self.asset_exists(ctx, id)? {
            return Err(ContractError::AlreadyExists { id: id.to_string() });
        }

        let bytes = Asset::new(approvement, approver).to_bytes()?;
        ctx.set_event(EventKind::CreateAsset.as_str(), bytes.clone())?;
        ctx.put_state(id, bytes)?;
        debug!(tx = ctx.tx_id(), id, "asset created");
        Ok(())
    }

    /// Read an asset. Fails with `NotFound` if `id` is absent.
    pub fn read_asset(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> Result<Asset, ContractError> {
        let bytes = ctx
            .get_state(id)?
            .ok_or_else(|| ContractError::NotFound { id: id.to_string() })?;
        Ok(Asset::from_bytes(&bytes)?)
    }

    /// Replace an existing asset wholesale. Fails with `NotFound` if absent.
    pub fn update_asset(
        &self,
        ctx: &mut dyn TransactionContext,
        id: &str,
        approvement: bool,
        approver: &str,
    ) -> Result<(), ContractError> {
        if !self.asset_exists(ctx, id)? {
            return Err(ContractError::NotFound { id: id.to_string() });
        }

        let bytes = Asset::new(approvement, approver).to_bytes()?;
        ctx.set_event(EventKind::UpdateAsset.as_str(), bytes.clone())?;
        ctx.put_state(id, bytes)?;
        debug!(tx = ctx.tx_id(), id, "asset updated");
        Ok(())
    }

    /// Delete an asset. The `DeleteAsset` event carries the value as it was
    /// immediately before deletion.
    pub fn delete_asset(
        &self,
        ctx: &mut dyn TransactionContext,
        id: &str,
    ) -> Result<(), ContractError> {
        let previous = ctx
            .get_state(id)?
            .ok_or_else(|| ContractError::NotFound { id: id.to_string() })?;

        ctx.set_event(EventKind::DeleteAsset.as_str(), previous)?;
        ctx.delete_state(id)?;
        debug!(tx = ctx.tx_id(), id, "asset deleted");
        Ok(())
    }

    /// Returns `true` if `id` is present in world state.
    pub fn asset_exists(
        &self,
        ctx: &dyn TransactionContext,
        id: &str,
    ) -> Result<bool, ContractError> {
        Ok(ctx.get_state(id)?.is_some())
    }

    /// Dispatch an externally callable transaction function by name.
    ///
    /// Arguments arrive as strings, as they do on the wire. Returns the JSON
    /// result: the asset for `ReadAsset`, a boolean for `AssetExists`, and an
    /// empty payload for mutations.
    pub fn invoke(
        &self,
        ctx: &mut dyn TransactionContext,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        match function {
            "CreateAsset" => {
                let [id, approvement, approver] = expect_args::<3>(function, args)?;
                self.create_asset(ctx, id, parse_bool(function, approvement)?, approver)?;
                Ok(Vec::new())
            }
            "ReadAsset" => {
                let [id] = expect_args::<1>(function, args)?;
                Ok(self.read_asset(ctx, id)?.to_bytes()?)
            }
            "UpdateAsset" => {
                let [id, approvement, approver] = expect_args::<3>(function, args)?;
                self.update_asset(ctx, id, parse_bool(function, approvement)?, approver)?;
                Ok(Vec::new())
            }
            "DeleteAsset" => {
                let [id] = expect_args::<1>(function, args)?;
                self.delete_asset(ctx, id)?;
                Ok(Vec::new())
            }
            "AssetExists" => {
                let [id] = expect_args::<1>(function, args)?;
                Ok(serde_json::to_vec(&self.asset_exists(ctx, id)?)?)
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }
}

fn expect_args<'a, const N: usize>(
    function: &str,
    args: &'a [String],
) -> Result<[&'a str; N], ContractError> {
    if args.len() != N {
        return Err(ContractError::InvalidArgument {
            function: function.to_string(),
            reason: format!("expected {N} arguments, got {}", args.len()),
        });
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

/// Boolean literals accepted by the platform's contract API.
fn parse_bool(function: &str, s: &str) -> Result<bool, ContractError> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(ContractError::InvalidArgument {
            function: function.to_string(),
            reason: format!("cannot parse {other:?} as bool"),
        }),
    }
}
