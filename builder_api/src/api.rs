use std::{sync::Arc, time::SystemTime};

use anyhow::{bail, ensure, Result};
use async_trait::async_trait;
use logging::{debug_with_slot, info_with_slot};
use mime::APPLICATION_JSON;
use prometheus_metrics::Metrics;
use reqwest::{header::ACCEPT, Client, Response, StatusCode, Url};
use thiserror::Error;
use types::{
    containers::{
        ExecutionPayloadAndBlobsBundle, SignedBlindedBeaconBlock, SignedBuilderBid,
        SignedValidatorRegistrationV1,
    },
    nonstandard::Phase,
    primitives::{ExecutionBlockHash, PublicKeyBytes, Slot, H256},
};

use crate::{
    client::BuilderClient,
    combined::{ExecutionPayloadResponse, SignedBuilderBidResponse},
    consts::{
        BLINDED_BLOCKS_REQUEST_TIMEOUT, DATE_MS_HEADER, ETH_CONSENSUS_VERSION,
        HEADER_REQUEST_TIMEOUT, STATUS_REQUEST_TIMEOUT, VALIDATORS_REQUEST_TIMEOUT,
    },
    BuilderConfig,
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum BuilderApiError {
    #[error("bad request to Builder API (builder node response: {message})")]
    BadRequest { message: String },
    #[error("builder node internal error (builder node response: {message})")]
    BuilderNodeInternalError { message: String },
    #[error("{missing_blocks} consecutive missing blocks since head")]
    ConsecutiveMissingBlocks { missing_blocks: u64 },
    #[error("{missing_blocks} missing blocks in the last rolling epoch")]
    RollingEpochMissingBlocks { missing_blocks: u64 },
    #[error(
        "execution payload root ({payload_root:?}) does not match header root ({header_root:?})"
    )]
    RootMismatch {
        header_root: H256,
        payload_root: H256,
    },
    #[error("received unexpected status code: {received}, expected: {expected}")]
    UnexpectedStatusCode {
        expected: StatusCode,
        received: StatusCode,
    },
    #[error(
        "Builder API responded with incorrect version \
         (computed: {computed}, response: {in_response})"
    )]
    VersionMismatch { computed: Phase, in_response: Phase },
    #[error("Builder API response for {phase} block is missing blobs bundle")]
    MissingBlobsBundle { phase: Phase },
    #[error("execution payload from Builder API does not have the fields of a {phase} payload")]
    PayloadFieldsMismatch { phase: Phase },
}

/// Builder API client over its JSON encoding.
pub struct Api {
    config: BuilderConfig,
    client: Client,
    metrics: Option<Arc<Metrics>>,
}

#[async_trait]
impl BuilderClient for Api {
    async fn status(&self) -> Result<()> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.builder_status_times.start_timer());

        let url = self.url("/eth/v1/builder/status")?;

        let response = self
            .client
            .get(url)
            .timeout(STATUS_REQUEST_TIMEOUT)
            .send()
            .await?;

        let response = handle_error(response).await?;

        ensure!(
            response.status() == StatusCode::OK,
            BuilderApiError::UnexpectedStatusCode {
                expected: StatusCode::OK,
                received: response.status(),
            },
        );

        Ok(())
    }

    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.builder_register_validator_times.start_timer());

        debug_with_slot!("registering {} validators with builder", registrations.len());

        let url = self.url("/eth/v1/builder/validators")?;

        let response = self
            .client
            .post(url)
            .timeout(VALIDATORS_REQUEST_TIMEOUT)
            .json(registrations)
            .send()
            .await?;

        let response = handle_error(response).await?;

        debug_with_slot!("register_validators response: {response:?}");

        Ok(())
    }

    async fn get_header(
        &self,
        slot: Slot,
        parent_hash: ExecutionBlockHash,
        pubkey: PublicKeyBytes,
    ) -> Result<Option<SignedBuilderBid>> {
        let _timer = self.metrics.as_ref().map(|metrics| {
            metrics
                .builder_get_execution_payload_header_times
                .start_timer()
        });

        let url = self.url(&format!(
            "/eth/v1/builder/header/{slot}/{parent_hash:?}/{pubkey:?}"
        ))?;

        debug_with_slot!("getting execution payload header from {url}");

        let request = self
            .client
            .get(url)
            .timeout(HEADER_REQUEST_TIMEOUT)
            .header(ACCEPT, APPLICATION_JSON.as_ref());

        let request = match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
            Ok(timestamp) => request.header(DATE_MS_HEADER, format!("{}", timestamp.as_millis())),
            Err(error) => {
                debug_with_slot!("unable to calculate timestamp: {error:?}");
                request
            }
        };

        let response = request.send().await?;
        let response = handle_error(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            info_with_slot!("builder has no execution payload header available for slot {slot}");
            return Ok(None);
        }

        let builder_bid = SignedBuilderBid::from(response.json::<SignedBuilderBidResponse>().await?);

        debug_with_slot!("get_execution_payload_header response: {builder_bid:?}");

        info_with_slot!("received execution payload header from builder for slot {slot}");

        Ok(Some(builder_bid))
    }

    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.builder_post_blinded_block_times.start_timer());

        let url = self.url("/eth/v1/builder/blinded_blocks")?;
        let slot = block.slot();
        let phase = block.phase();

        debug_with_slot!("posting blinded block for slot {slot} to {url}");

        let response = self
            .client
            .post(url)
            .timeout(BLINDED_BLOCKS_REQUEST_TIMEOUT)
            .header(ETH_CONSENSUS_VERSION, phase.as_ref())
            .json(block)
            .send()
            .await?;

        let response = handle_error(response).await?;
        let response = response.json::<ExecutionPayloadResponse>().await?;

        validate_phase(phase, response.phase())?;

        let response = ExecutionPayloadAndBlobsBundle::from(response);

        ensure!(
            !phase.has_blobs() || response.blobs_bundle.is_some(),
            BuilderApiError::MissingBlobsBundle { phase },
        );

        ensure!(
            response.execution_payload.matches_phase(phase),
            BuilderApiError::PayloadFieldsMismatch { phase },
        );

        let header_root = block.execution_payload_header().root();
        let payload_root = response.execution_payload.header_root();

        ensure!(
            payload_root == header_root,
            BuilderApiError::RootMismatch {
                header_root,
                payload_root,
            },
        );

        info_with_slot!("received execution payload from builder for slot {slot}");

        Ok(response)
    }
}

impl Api {
    #[must_use]
    pub const fn new(config: BuilderConfig, client: Client, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            config,
            client,
            metrics,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.config.builder_api_url.join(path).map_err(Into::into)
    }
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(BuilderApiError::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(BuilderApiError::BuilderNodeInternalError { message });
    }

    Ok(response)
}

fn validate_phase(computed: Phase, in_response: Phase) -> Result<()> {
    ensure!(
        computed == in_response,
        BuilderApiError::VersionMismatch {
            computed,
            in_response,
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;
    use types::{
        containers::{
            BlindedBeaconBlock, BlobsBundle, BuilderBid, ExecutionPayload, Transaction, Withdrawal,
        },
        primitives::{ExecutionAddress, SignatureBytes, Wei},
    };

    use super::*;

    fn api(server: &MockServer) -> Result<Api> {
        let config = BuilderConfig::new(server.url("/").parse()?);
        Ok(Api::new(config, Client::new(), None))
    }

    fn execution_payload(phase: Phase) -> ExecutionPayload {
        let withdrawal = Withdrawal {
            index: 5,
            validator_index: 6,
            address: ExecutionAddress::repeat_byte(7),
            amount: 32_000_000_000,
        };

        ExecutionPayload {
            parent_hash: H256::repeat_byte(1),
            block_number: 11,
            timestamp: 1_700_000_012,
            block_hash: H256::repeat_byte(2),
            transactions: vec![Transaction::from(vec![2, 3, 4])],
            withdrawals: phase.has_withdrawals().then(|| vec![withdrawal]),
            blob_gas_used: phase.has_blobs().then_some(131_072),
            excess_blob_gas: phase.has_blobs().then_some(0),
            ..ExecutionPayload::default()
        }
    }

    fn signed_blinded_block(phase: Phase, payload: &ExecutionPayload) -> SignedBlindedBeaconBlock {
        SignedBlindedBeaconBlock {
            phase,
            message: BlindedBeaconBlock {
                slot: 12,
                proposer_index: 7,
                parent_root: H256::repeat_byte(3),
                state_root: H256::repeat_byte(4),
                execution_payload_header: Arc::new(payload.to_header()),
                blob_kzg_commitments: phase.has_blobs().then(Vec::new),
            },
            signature: SignatureBytes::zero(),
        }
    }

    #[tokio::test]
    async fn status_succeeds_on_ok() -> Result<()> {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(GET).path("/eth/v1/builder/status");
            then.status(200);
        });

        api(&server)?.status().await?;

        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn status_reports_server_errors() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/eth/v1/builder/status");
            then.status(503).body("relay is down");
        });

        let error = api(&server)?
            .status()
            .await
            .expect_err("503 should be reported as an error");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::BuilderNodeInternalError {
                message: "relay is down".to_owned(),
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_header_returns_none_on_no_content() -> Result<()> {
        let server = MockServer::start();
        let parent_hash = H256::repeat_byte(0xaa);
        let pubkey = PublicKeyBytes::repeat_byte(0xbb);

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/eth/v1/builder/header/5/{parent_hash:?}/{pubkey:?}"))
                .header_exists(DATE_MS_HEADER);
            then.status(204);
        });

        let header = api(&server)?.get_header(5, parent_hash, pubkey).await?;

        mock.assert();
        assert_eq!(header, None);

        Ok(())
    }

    #[tokio::test]
    async fn get_header_parses_versioned_bid() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Capella);
        let parent_hash = payload.parent_hash;
        let pubkey = PublicKeyBytes::repeat_byte(0xbb);

        let bid = BuilderBid {
            header: Arc::new(payload.to_header()),
            blob_kzg_commitments: None,
            execution_requests: None,
            value: Wei::from(1_000_u64),
            pubkey,
        };

        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/eth/v1/builder/header/12/{parent_hash:?}/{pubkey:?}"));
            then.status(200).json_body(json!({
                "version": "capella",
                "data": {
                    "message": bid,
                    "signature": SignatureBytes::zero(),
                },
            }));
        });

        let builder_bid = api(&server)?
            .get_header(12, parent_hash, pubkey)
            .await?
            .expect("builder should return a bid");

        assert_eq!(builder_bid.phase(), Phase::Capella);
        assert_eq!(builder_bid.message, bid);

        Ok(())
    }

    #[tokio::test]
    async fn get_payload_returns_payload_matching_header() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Deneb);
        let block = signed_blinded_block(Phase::Deneb, &payload);

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/eth/v1/builder/blinded_blocks")
                .header(ETH_CONSENSUS_VERSION, "deneb");
            then.status(200).json_body(json!({
                "version": "deneb",
                "data": {
                    "execution_payload": payload,
                    "blobs_bundle": BlobsBundle::default(),
                },
            }));
        });

        let response = api(&server)?.get_payload(&block).await?;

        mock.assert();
        assert_eq!(*response.execution_payload, payload);
        assert_eq!(response.blobs_bundle.as_deref(), Some(&BlobsBundle::default()));

        Ok(())
    }

    #[tokio::test]
    async fn get_payload_rejects_root_mismatch() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Capella);
        let block = signed_blinded_block(Phase::Capella, &payload);

        let other_payload = ExecutionPayload {
            block_number: 12,
            ..payload.clone()
        };

        server.mock(|when, then| {
            when.method(POST).path("/eth/v1/builder/blinded_blocks");
            then.status(200).json_body(json!({
                "version": "capella",
                "data": other_payload,
            }));
        });

        let error = api(&server)?
            .get_payload(&block)
            .await
            .expect_err("payload does not match the header");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::RootMismatch {
                header_root: payload.header_root(),
                payload_root: other_payload.header_root(),
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_payload_rejects_version_mismatch() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Capella);
        let block = signed_blinded_block(Phase::Capella, &payload);

        server.mock(|when, then| {
            when.method(POST).path("/eth/v1/builder/blinded_blocks");
            then.status(200).json_body(json!({
                "version": "bellatrix",
                "data": payload,
            }));
        });

        let error = api(&server)?
            .get_payload(&block)
            .await
            .expect_err("builder responded with a different version");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::VersionMismatch {
                computed: Phase::Capella,
                in_response: Phase::Bellatrix,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_payload_requires_blobs_bundle_from_deneb() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Deneb);
        let block = signed_blinded_block(Phase::Deneb, &payload);

        server.mock(|when, then| {
            when.method(POST).path("/eth/v1/builder/blinded_blocks");
            then.status(200).json_body(json!({
                "version": "deneb",
                "data": {
                    "execution_payload": payload,
                },
            }));
        });

        let error = api(&server)?
            .get_payload(&block)
            .await
            .expect_err("blobs bundle is missing");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::MissingBlobsBundle {
                phase: Phase::Deneb,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_payload_rejects_payload_without_fields_of_its_phase() -> Result<()> {
        let server = MockServer::start();
        let payload = execution_payload(Phase::Bellatrix);
        let block = signed_blinded_block(Phase::Capella, &payload);

        server.mock(|when, then| {
            when.method(POST).path("/eth/v1/builder/blinded_blocks");
            then.status(200).json_body(json!({
                "version": "capella",
                "data": payload,
            }));
        });

        let error = api(&server)?
            .get_payload(&block)
            .await
            .expect_err("capella payload must have withdrawals");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::PayloadFieldsMismatch {
                phase: Phase::Capella,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn register_validators_posts_json() -> Result<()> {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/eth/v1/builder/validators")
                .json_body(json!([]));
            then.status(200);
        });

        api(&server)?.register_validators(&[]).await?;

        mock.assert();

        Ok(())
    }

    #[tokio::test]
    async fn register_validators_reports_bad_request() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/eth/v1/builder/validators");
            then.status(400).body("unknown validator");
        });

        let error = api(&server)?
            .register_validators(&[])
            .await
            .expect_err("400 should be reported as an error");

        assert_eq!(
            error.downcast_ref::<BuilderApiError>(),
            Some(&BuilderApiError::BadRequest {
                message: "unknown validator".to_owned(),
            }),
        );

        Ok(())
    }
}
