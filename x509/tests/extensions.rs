use certext_asn1::{Element, OctetString};
use certext_x509::extensions::{
    AuthorityKeyIdentifier, BasicConstraintsSyntax, DerCodec, Extension, Extensions, GeneralName,
    ParsedExtension, PolicyConstraintsSyntax, PolicyMapping, PolicyMappingsSyntax, RawExtension,
};
use certext_x509::Result;
use rstest::rstest;

// keyid:78:D4:81:76:CD:F7:8D:59:6D:D4:C4:86:A4:1D:23:0A:53:CE:CD:D7
const KEY_ID: [u8; 20] = [
    0x78, 0xD4, 0x81, 0x76, 0xCD, 0xF7, 0x8D, 0x59, 0x6D, 0xD4, 0xC4, 0x86, 0xA4, 0x1D, 0x23,
    0x0A, 0x53, 0xCE, 0xCD, 0xD7,
];

/// Extensions of an intermediate CA certificate:
/// basicConstraints (critical) CA:TRUE, pathlen:0
/// authorityKeyIdentifier keyid only
/// policyConstraints (critical) requireExplicitPolicy:0
/// policyMappings anyPolicy:1.2.3.4
/// keyUsage (critical) keyCertSign, cRLSign
fn ca_extensions_der() -> Vec<u8> {
    let mut der = vec![0x30, 0x6e];
    // basicConstraints
    der.extend_from_slice(&[
        0x30, 0x12, 0x06, 0x03, 0x55, 0x1d, 0x13, 0x01, 0x01, 0xff, 0x04, 0x08, 0x30, 0x06, 0x01,
        0x01, 0xff, 0x02, 0x01, 0x00,
    ]);
    // authorityKeyIdentifier
    der.extend_from_slice(&[
        0x30, 0x1f, 0x06, 0x03, 0x55, 0x1d, 0x23, 0x04, 0x18, 0x30, 0x16, 0x80, 0x14,
    ]);
    der.extend_from_slice(&KEY_ID);
    // policyConstraints
    der.extend_from_slice(&[
        0x30, 0x0f, 0x06, 0x03, 0x55, 0x1d, 0x24, 0x01, 0x01, 0xff, 0x04, 0x05, 0x30, 0x03, 0x80,
        0x01, 0x00,
    ]);
    // policyMappings
    der.extend_from_slice(&[
        0x30, 0x16, 0x06, 0x03, 0x55, 0x1d, 0x21, 0x04, 0x0f, 0x30, 0x0d, 0x30, 0x0b, 0x06, 0x04,
        0x55, 0x1d, 0x20, 0x00, 0x06, 0x03, 0x2a, 0x03, 0x04,
    ]);
    // keyUsage
    der.extend_from_slice(&[
        0x30, 0x0e, 0x06, 0x03, 0x55, 0x1d, 0x0f, 0x01, 0x01, 0xff, 0x04, 0x04, 0x03, 0x02, 0x01,
        0x06,
    ]);
    der
}

#[test]
fn test_decode_ca_extensions() {
    let der = ca_extensions_der();
    let extensions = Extensions::from_bytes(&der).unwrap();
    assert_eq!(5, extensions.extensions().len());

    let bc = extensions
        .extension::<BasicConstraintsSyntax>()
        .unwrap()
        .unwrap();
    assert!(bc.ca);
    assert_eq!(Some(0), bc.path_len_constraint);

    let aki = extensions
        .extension::<AuthorityKeyIdentifier>()
        .unwrap()
        .unwrap();
    assert_eq!(&KEY_ID, aki.key_identifier());
    assert!(aki.authority_cert_serial_number().is_none());

    let pc = extensions
        .extension::<PolicyConstraintsSyntax>()
        .unwrap()
        .unwrap();
    assert_eq!(PolicyConstraintsSyntax::RequireOnly(0), pc);

    let pm = extensions
        .extension::<PolicyMappingsSyntax>()
        .unwrap()
        .unwrap();
    assert_eq!(
        &[PolicyMapping::new("2.5.29.32.0", "1.2.3.4").unwrap()],
        pm.mappings()
    );

    let key_usage = extensions.get("2.5.29.15").unwrap().unwrap();
    assert!(key_usage.is_critical());
    assert_eq!(&[0x03, 0x02, 0x01, 0x06], key_usage.value().as_bytes());

    assert_eq!(der, extensions.to_bytes().unwrap());
}

#[test]
fn test_parse_known_ca_extensions() {
    let extensions = Extensions::from_bytes(&ca_extensions_der()).unwrap();
    let parsed = extensions.parse_known().unwrap();
    assert!(matches!(parsed[0], ParsedExtension::BasicConstraints(_)));
    assert!(matches!(parsed[1], ParsedExtension::AuthorityKeyIdentifier(_)));
    assert!(matches!(parsed[2], ParsedExtension::PolicyConstraints(_)));
    assert!(matches!(parsed[3], ParsedExtension::PolicyMappings(_)));
    assert!(matches!(parsed[4], ParsedExtension::Unsupported(_)));

    let text = extensions.to_string();
    assert!(text.starts_with("        X509v3 extensions:\n"));
    assert!(text.contains("                CA:TRUE, pathlen:0\n"));
    assert!(text.contains("keyid:78:D4:81:76"));
    assert!(text.contains("                Require Explicit Policy:0\n"));
    assert!(text.contains("                2.5.29.32.0:1.2.3.4\n"));
    assert!(text.contains("            2.5.29.15: critical\n"));
}

#[test]
fn test_basic_constraints_end_to_end() {
    let bc = BasicConstraintsSyntax {
        ca: true,
        path_len_constraint: Some(3),
    };
    let bytes = bc.to_bytes().unwrap();
    assert_eq!(vec![0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0x03], bytes);

    let decoded = BasicConstraintsSyntax::from_bytes(&bytes).unwrap();
    assert!(decoded.ca);
    assert_eq!(Some(3), decoded.path_len_constraint);
}

#[test]
fn test_policy_mapping_end_to_end() {
    let mapping = PolicyMapping::new("2.5.29.32.0", "1.2.3.4").unwrap();
    let bytes = mapping.to_bytes().unwrap();
    assert_eq!(
        vec![
            0x30, 0x0b, 0x06, 0x04, 0x55, 0x1d, 0x20, 0x00, 0x06, 0x03, 0x2a, 0x03, 0x04
        ],
        bytes
    );

    let decoded = PolicyMapping::from_bytes(&bytes).unwrap();
    assert_eq!("2.5.29.32.0", decoded.issuer_domain_policy.to_string());
    assert_eq!("1.2.3.4", decoded.subject_domain_policy.to_string());
    assert_eq!(mapping, decoded);
}

#[rstest]
#[case(
    AuthorityKeyIdentifier::from_parts(KEY_ID.to_vec(), None, None).unwrap()
)]
#[case(
    AuthorityKeyIdentifier::from_parts(
        KEY_ID.to_vec(),
        Some(GeneralName::DnsName("ca.example.com".to_string()).into()),
        Some(vec![0x10, 0x00]),
    )
    .unwrap()
)]
fn test_authority_key_identifier_round_trip(#[case] aki: AuthorityKeyIdentifier) {
    let raw = RawExtension::from_extension(&aki, false).unwrap();
    assert_eq!("2.5.29.35", raw.oid().to_string());
    let decoded: AuthorityKeyIdentifier = raw.parse().unwrap();
    assert_eq!(aki, decoded);
}

#[rstest]
#[case(PolicyConstraintsSyntax::RequireOnly(0))]
#[case(PolicyConstraintsSyntax::InhibitOnly(2))]
#[case(PolicyConstraintsSyntax::Both(1, 300))]
fn test_policy_constraints_round_trip(#[case] pc: PolicyConstraintsSyntax) {
    let bytes = pc.to_bytes().unwrap();
    assert_eq!(pc, PolicyConstraintsSyntax::from_bytes(&bytes).unwrap());
}

#[test]
fn test_policy_constraints_requires_a_field() {
    let err = PolicyConstraintsSyntax::new(None, None).unwrap_err();
    assert_eq!("PolicyConstraints: empty content", err.to_string());
}

#[rstest]
// explicit cA FALSE is a DER violation
#[case::basic_constraints_explicit_false(
    &[0x30, 0x03, 0x01, 0x01, 0x00],
    "BasicConstraints: cA must be omitted instead of encoding its DEFAULT value"
)]
#[case::basic_constraints_tail_out_of_order(
    &[0x30, 0x09, 0x01, 0x01, 0xff, 0x82, 0x01, 0x00, 0x81, 0x01, 0x00],
    "BasicConstraints: extension elements are not in canonical order"
)]
#[case::authority_key_identifier_two_elements(
    &[0x30, 0x05, 0x80, 0x01, 0x01, 0x82, 0x00],
    "AuthorityKeyIdentifier: expected 1 or 3 elements, got 2"
)]
#[case::authority_key_identifier_empty_serial(
    &[0x30, 0x0a, 0x80, 0x01, 0x01, 0xa1, 0x03, 0x82, 0x01, 0x61, 0x82, 0x00],
    "AuthorityKeyIdentifier: authorityCertSerialNumber: INTEGER: no data"
)]
#[case::authority_key_identifier_non_minimal_serial(
    &[0x30, 0x0c, 0x80, 0x01, 0x01, 0xa1, 0x03, 0x82, 0x01, 0x61, 0x82, 0x02, 0x00, 0x01],
    "AuthorityKeyIdentifier: authorityCertSerialNumber: INTEGER: not minimally encoded"
)]
#[case::policy_constraints_inhibit_without_require(
    &[0x30, 0x06, 0x02, 0x01, 0x00, 0x81, 0x01, 0x01],
    "PolicyConstraints: missing requireExplicitPolicy element before inhibitPolicyMapping"
)]
#[case::policy_constraints_tail_out_of_order(
    &[0x30, 0x09, 0x80, 0x01, 0x00, 0x83, 0x01, 0x00, 0x82, 0x01, 0x00],
    "PolicyConstraints: extension elements are not in canonical order"
)]
#[case::policy_mapping_one_element(
    &[0x30, 0x05, 0x06, 0x03, 0x2a, 0x03, 0x04],
    "PolicyMapping: expected at least 2 elements, got 1"
)]
#[case::policy_mappings_empty(&[0x30, 0x00], "PolicyMappings: empty content")]
fn test_rejects_non_der(#[case] input: &[u8], #[case] expected_error_msg: &str) {
    let result: Result<()> = match expected_error_msg.split(':').next() {
        Some("BasicConstraints") => BasicConstraintsSyntax::from_bytes(input).map(drop),
        Some("AuthorityKeyIdentifier") => AuthorityKeyIdentifier::from_bytes(input).map(drop),
        Some("PolicyConstraints") => PolicyConstraintsSyntax::from_bytes(input).map(drop),
        Some("PolicyMapping") => PolicyMapping::from_bytes(input).map(drop),
        _ => PolicyMappingsSyntax::from_bytes(input).map(drop),
    };
    let err_str = result.unwrap_err().to_string();
    assert!(
        err_str.contains(expected_error_msg),
        "Expected error message containing '{}', but got '{}'",
        expected_error_msg,
        err_str
    );
}

#[rstest]
#[case::basic_constraints(
    &[0x30, 0x09, 0x01, 0x01, 0xff, 0x81, 0x01, 0x00, 0x82, 0x01, 0x00],
    &[0x30, 0x03, 0x01, 0x01, 0xff]
)]
#[case::basic_constraints_absent_ca(&[0x30, 0x00], &[0x30, 0x00])]
fn test_basic_constraints_canonical_tail_is_dropped(
    #[case] input: &[u8],
    #[case] expected: &[u8],
) {
    let bc = BasicConstraintsSyntax::from_bytes(input).unwrap();
    assert_eq!(expected, bc.to_bytes().unwrap().as_slice());
}

#[test]
fn test_policy_constraints_canonical_tail_is_dropped() {
    let input = [
        0x30, 0x09, 0x80, 0x01, 0x00, 0x82, 0x01, 0x00, 0x83, 0x01, 0x00,
    ];
    let pc = PolicyConstraintsSyntax::from_bytes(&input).unwrap();
    assert_eq!(PolicyConstraintsSyntax::RequireOnly(0), pc);
    assert_eq!(
        vec![0x30, 0x03, 0x80, 0x01, 0x00],
        pc.to_bytes().unwrap()
    );
}

#[test]
fn test_raw_extension_oid_mismatch() {
    let raw = RawExtension::from_extension(&PolicyConstraintsSyntax::InhibitOnly(0), true).unwrap();
    let err = raw.parse::<BasicConstraintsSyntax>().unwrap_err();
    assert_eq!(
        "extension OID mismatch: expected 2.5.29.19, got 2.5.29.36",
        err.to_string()
    );
}

#[test]
fn test_extension_value_from_element_tree() {
    // extnValue contents handed over by a certificate parser
    let value = OctetString::from(vec![0x30, 0x03, 0x80, 0x01, 0x02]);
    let pc = PolicyConstraintsSyntax::parse(&value).unwrap();
    assert_eq!(Some(2), pc.require_explicit_policy());
    assert_eq!(None, pc.inhibit_policy_mapping());

    let element = Element::from_der_bytes(value.as_bytes()).unwrap();
    assert_eq!(pc, PolicyConstraintsSyntax::from_element(&element).unwrap());
    assert_eq!(element, pc.to_element().unwrap());
}
