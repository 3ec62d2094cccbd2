//! Tests for signed observations and quorum-attested reports

use ocrnode_core::OnchainKeyring;
use ocrnode_protocol::{
    AttestedReportMany, AttestedReportOne, SignedObservation, VerificationError,
};
use ocrnode_testkit::TestCluster;
use ocrnode_types::{
    AttributedOnchainSignature, ConfigDigest, OracleId, OracleIdentity, ReportContext, ReportTimestamp,
};

fn create_test_context(cluster: &TestCluster) -> ReportContext {
    let digest = cluster.contract_config().config_digest;
    ReportContext::new(ReportTimestamp::new(digest, 3, 2), [0xE7; 32])
}

fn create_test_identities(cluster: &TestCluster) -> Vec<OracleIdentity> {
    cluster.shared_config(0).0.oracle_identities.clone()
}

fn create_test_attested_report(
    cluster: &TestCluster,
    ctx: &ReportContext,
    signers: &[u8],
) -> AttestedReportMany {
    let report = b"median=42".to_vec();
    let attributed_signatures = signers
        .iter()
        .map(|&i| AttributedOnchainSignature {
            signature: cluster.oracles[i as usize]
                .onchain_keyring
                .sign(ctx, &report)
                .unwrap(),
            signer: OracleId(i),
        })
        .collect();
    AttestedReportMany {
        report,
        attributed_signatures,
    }
}

// =============================================================================
// Signed observations
// =============================================================================

#[test]
fn test_signed_observation_verifies() {
    let cluster = TestCluster::new(4, 1);
    let oracle = &cluster.oracles[1];
    let ts = create_test_context(&cluster).report_timestamp;

    let signed =
        SignedObservation::sign(&ts, b"query", b"obs".to_vec(), oracle.offchain_keyring.as_ref())
            .unwrap();
    assert!(signed
        .verify(&ts, b"query", &oracle.identity.offchain_public_key)
        .is_ok());
}

#[test]
fn test_signed_observation_bound_to_every_input() {
    let cluster = TestCluster::new(4, 1);
    let oracle = &cluster.oracles[1];
    let ts = create_test_context(&cluster).report_timestamp;
    let key = oracle.identity.offchain_public_key;

    let signed =
        SignedObservation::sign(&ts, b"query", b"obs".to_vec(), oracle.offchain_keyring.as_ref())
            .unwrap();

    let other_round = ReportTimestamp::new(ts.config_digest, ts.epoch, ts.round + 1);
    assert!(matches!(
        signed.verify(&other_round, b"query", &key),
        Err(VerificationError::InvalidObservationSignature)
    ));
    let other_digest = ReportTimestamp::new(ConfigDigest::new([0xEE; 32]), ts.epoch, ts.round);
    assert!(matches!(
        signed.verify(&other_digest, b"query", &key),
        Err(VerificationError::InvalidObservationSignature)
    ));
    let other_epoch = ReportTimestamp::new(ts.config_digest, ts.epoch + 1, ts.round);
    assert!(matches!(
        signed.verify(&other_epoch, b"query", &key),
        Err(VerificationError::InvalidObservationSignature)
    ));
    assert!(signed.verify(&ts, b"other", &key).is_err());
    assert!(signed
        .verify(&ts, b"query", &cluster.oracles[2].identity.offchain_public_key)
        .is_err());

    let mut tampered = signed.clone();
    tampered.observation = b"obz".to_vec();
    assert!(tampered.verify(&ts, b"query", &key).is_err());

    let mut truncated = signed;
    truncated.signature.pop();
    assert!(truncated.verify(&ts, b"query", &key).is_err());
}

// =============================================================================
// Single attestations
// =============================================================================

#[test]
fn test_attested_report_one_noskip() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let attested = AttestedReportOne::noskip(&ctx, b"r".to_vec(), keyring).unwrap();
    assert!(attested.verify(keyring, &keyring.public_key(), &ctx).is_ok());

    let other = cluster.oracles[1].onchain_keyring.public_key();
    assert!(matches!(
        attested.verify(keyring, &other, &ctx),
        Err(VerificationError::InvalidReportSignature)
    ));
}

#[test]
fn test_attested_report_one_skip_must_be_empty() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    assert!(AttestedReportOne::skip()
        .verify(keyring, &keyring.public_key(), &ctx)
        .is_ok());

    let mut bad = AttestedReportOne::skip();
    bad.report = b"x".to_vec();
    assert!(matches!(
        bad.verify(keyring, &keyring.public_key(), &ctx),
        Err(VerificationError::SkipWithPayload)
    ));
}

#[test]
fn test_eq_except_signature() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let a = AttestedReportOne::noskip(&ctx, b"r".to_vec(), cluster.oracles[0].onchain_keyring.as_ref())
        .unwrap();
    let b = AttestedReportOne::noskip(&ctx, b"r".to_vec(), cluster.oracles[1].onchain_keyring.as_ref())
        .unwrap();
    assert_ne!(a, b);
    assert!(a.eq_except_signature(&b));
    assert!(!a.eq_except_signature(&AttestedReportOne::skip()));
}

// =============================================================================
// Quorum attestations
// =============================================================================

#[test]
fn test_exact_quorum_verifies() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let report = create_test_attested_report(&cluster, &ctx, &[3, 0, 2]);
    assert!(report
        .verify_signatures(3, keyring, &identities, &ctx)
        .is_ok());
}

#[test]
fn test_wrong_signature_count() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let mut report = create_test_attested_report(&cluster, &ctx, &[0, 1, 2]);
    report.attributed_signatures.pop();
    assert!(matches!(
        report.verify_signatures(3, keyring, &identities, &ctx),
        Err(VerificationError::WrongSignatureCount {
            expected: 3,
            actual: 2
        })
    ));

    let too_many = create_test_attested_report(&cluster, &ctx, &[0, 1, 2, 3]);
    assert!(too_many
        .verify_signatures(3, keyring, &identities, &ctx)
        .is_err());
}

#[test]
fn test_duplicate_signer_rejected() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let report = create_test_attested_report(&cluster, &ctx, &[1, 2, 1]);
    assert!(matches!(
        report.verify_signatures(3, keyring, &identities, &ctx),
        Err(VerificationError::DuplicateSigner(OracleId(1)))
    ));
}

#[test]
fn test_flipped_signature_byte_rejected() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let mut report = create_test_attested_report(&cluster, &ctx, &[0, 1, 2]);
    report.attributed_signatures[1].signature[10] ^= 0x01;
    assert!(matches!(
        report.verify_signatures(3, keyring, &identities, &ctx),
        Err(VerificationError::SignatureDoesNotVerify { index: 1, .. })
    ));
}

#[test]
fn test_signature_attributed_to_wrong_oracle_rejected() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let mut report = create_test_attested_report(&cluster, &ctx, &[0, 1, 2]);
    report.attributed_signatures[2].signer = OracleId(3);
    assert!(report
        .verify_signatures(3, keyring, &identities, &ctx)
        .is_err());
}

#[test]
fn test_out_of_range_signer_rejected() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let mut report = create_test_attested_report(&cluster, &ctx, &[0, 1, 2]);
    report.attributed_signatures[0].signer = OracleId(4);
    assert!(matches!(
        report.verify_signatures(3, keyring, &identities, &ctx),
        Err(VerificationError::SignerOutOfBounds(OracleId(4)))
    ));
}

#[test]
fn test_other_context_rejected() {
    let cluster = TestCluster::new(4, 1);
    let ctx = create_test_context(&cluster);
    let identities = create_test_identities(&cluster);
    let keyring = cluster.oracles[0].onchain_keyring.as_ref();

    let report = create_test_attested_report(&cluster, &ctx, &[0, 1, 2]);
    let other = ReportContext::new(ctx.report_timestamp, [0; 32]);
    assert!(report
        .verify_signatures(3, keyring, &identities, &other)
        .is_err());
}
