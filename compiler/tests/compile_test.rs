#![cfg(test)]

use std::fs;

use brine_proto_compiler::{
    compile_dir, compile_schema,
    gen_rust::generate_rust,
    parser::parse_schema,
    tokenizer::tokenize_schema,
    Event, ProtoError, SchemaBatch,
};
use pretty_assertions::assert_eq;

const USER_PROTO: &str = r#"
syntax = "proto3";

package hdlctrl.v1;

import "hdlctrl/v1/common.proto";

// A headless host as seen by a user.
message HeadlessHost {
  string id = 1;
  string name = 2;
  optional string account_id = 3;
  repeated string tags = 4;
  AccessLevel access_level = 5;
  int32 max_users = 6 [deprecated = true];
  google.protobuf.Timestamp started_at = 7;

  oneof location {
    string region = 10;
    string address = 11;
  }

  message Stats {
    int32 users = 1;
  }
  Stats stats = 8;
}

service UserService {
  rpc ListHosts(ListHostsRequest) returns (ListHostsResponse);
}

message ListHostsRequest {}
message ListHostsResponse {
  repeated HeadlessHost hosts = 1;
}
"#;

const COMMON_PROTO: &str = r#"
syntax = "proto3";

package hdlctrl.v1;

enum AccessLevel {
  ACCESS_LEVEL_UNSPECIFIED = 0;
  ACCESS_LEVEL_PRIVATE = 1;
  ACCESS_LEVEL_FRIENDS = 2;
}
"#;

#[test]
fn test_parse_schema() {
    let tokens = tokenize_schema(USER_PROTO).expect("tokenize_schema failed");
    let unit = parse_schema(&tokens).expect("parse_schema failed");

    assert_eq!(unit.syntax.as_deref(), Some("proto3"));
    assert_eq!(unit.package, "hdlctrl.v1");
    assert_eq!(unit.imports, vec!["hdlctrl/v1/common.proto".to_string()]);
    assert!(unit.diagnostics.is_empty());

    assert_eq!(unit.messages.len(), 3);
    let host = &unit.messages[0];
    assert_eq!(host.name, "HeadlessHost");

    let fields: Vec<(&str, &str, i32, bool, bool, bool)> = host
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.type_.as_str(), f.number, f.is_optional, f.is_repeated, f.is_deprecated))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("id", "string", 1, false, false, false),
            ("name", "string", 2, false, false, false),
            ("account_id", "string", 3, true, false, false),
            ("tags", "string", 4, false, true, false),
            ("access_level", "AccessLevel", 5, false, false, false),
            ("max_users", "int32", 6, false, false, true),
            ("started_at", "google.protobuf.Timestamp", 7, false, false, false),
            ("stats", "Stats", 8, false, false, false),
        ]
    );

    assert_eq!(host.oneofs.len(), 1);
    assert_eq!(host.oneofs[0].name, "location");
    assert_eq!(host.oneofs[0].fields.len(), 2);
    assert!(host.oneofs[0].fields.iter().all(|f| f.is_optional));
    assert_eq!(host.nested_messages.len(), 1);
    assert_eq!(host.nested_messages[0].name, "Stats");

    assert_eq!(unit.services.len(), 1);
    assert_eq!(unit.services[0].rpcs[0].name, "ListHosts");
    assert_eq!(unit.services[0].rpcs[0].request_type, "ListHostsRequest");
    assert_eq!(unit.services[0].rpcs[0].response_type, "ListHostsResponse");
}

#[test]
fn test_cross_file_generation() {
    let batch: SchemaBatch = vec![
        ("hdlctrl/v1/user.proto".to_string(), compile_schema(USER_PROTO).unwrap()),
        ("hdlctrl/v1/common.proto".to_string(), compile_schema(COMMON_PROTO).unwrap()),
    ]
    .into_iter()
    .collect();

    let user = generate_rust("hdlctrl/v1/user.proto", &batch).unwrap().unwrap();
    assert_eq!(user.file_name, "user.g.rs");
    assert!(user.code.starts_with("// @generated"));
    assert!(user.code.contains("pub access_level: super::common::AccessLevel,"), "{}", user.code);
    assert!(user.code.contains("pub stats: ::core::option::Option<headless_host::Stats>,"));
    assert!(user.code.contains("pub struct UserServiceClient<T> {"));
    assert!(!user.code.contains("#!["), "generated code is included and must not carry inner attributes");

    let common = generate_rust("hdlctrl/v1/common.proto", &batch).unwrap().unwrap();
    assert!(common.code.contains("pub enum AccessLevel {"));
    assert!(common.code.contains("Friends = 2,"));
}

#[test]
fn test_unresolved_type_without_declaring_file() {
    let batch: SchemaBatch = vec![("a.proto".to_string(), compile_schema("message M { T t = 1; }").unwrap())]
        .into_iter()
        .collect();
    match generate_rust("a.proto", &batch) {
        Err(ProtoError::UnresolvedType { type_ref, referenced_from }) => {
            assert_eq!(type_ref, "T");
            assert_eq!(referenced_from, "M");
        }
        other => panic!("expected an unresolved type error, got {:?}", other),
    }

    let batch: SchemaBatch = vec![
        ("a.proto".to_string(), compile_schema("message M { T t = 1; }").unwrap()),
        ("b.proto".to_string(), compile_schema("message T { string id = 1; }").unwrap()),
    ]
    .into_iter()
    .collect();
    let code = generate_rust("a.proto", &batch).unwrap().unwrap().code;
    assert!(code.contains("pub t: ::core::option::Option<super::b::T>,"), "{}", code);
}

#[test]
fn test_compile_dir() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("generated");

    fs::create_dir_all(input.path().join("hdlctrl/v1")).unwrap();
    fs::write(input.path().join("hdlctrl/v1/user.proto"), USER_PROTO).unwrap();
    fs::write(input.path().join("hdlctrl/v1/common.proto"), COMMON_PROTO).unwrap();
    fs::write(input.path().join("empty.proto"), "syntax = \"proto3\";\npackage empty;\n").unwrap();
    fs::write(input.path().join("broken.proto"), "message Broken {\n  int32 a = 1;\n").unwrap();
    fs::write(input.path().join("dangling.proto"), "message D { Missing m = 1; }").unwrap();
    fs::write(input.path().join("notes.txt"), "message Ignored {}").unwrap();

    let mut events = Vec::new();
    let summary = compile_dir(input.path(), &out_dir, |event| {
        events.push(match event {
            Event::Found { count } => format!("found {}", count),
            Event::Parsed { file_id, messages, enums, .. } => format!("parsed {} {} {}", file_id, messages, enums),
            Event::ParseFailed { file_id, .. } => format!("parse failed {}", file_id),
            Event::Skipped { file_id } => format!("skipped {}", file_id),
            Event::Generated { file_id, .. } => format!("generated {}", file_id),
            Event::Failed { file_id, .. } => format!("failed {}", file_id),
        })
    })
    .unwrap();

    assert_eq!(
        events,
        vec![
            "found 5",
            "parse failed broken.proto",
            "parsed dangling.proto 1 0",
            "parsed empty.proto 0 0",
            "parsed hdlctrl/v1/common.proto 0 1",
            "parsed hdlctrl/v1/user.proto 3 0",
            "failed dangling.proto",
            "skipped empty.proto",
            "generated hdlctrl/v1/common.proto",
            "generated hdlctrl/v1/user.proto",
        ]
    );
    assert_eq!(summary.found, 5);
    assert_eq!(summary.parsed, 4);
    assert_eq!(summary.parse_failures, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.generated, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.io_failures, 0);
    assert!(!summary.is_clean());

    let mut written: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(written, vec!["common.g.rs", "user.g.rs"]);
}

#[test]
fn test_compile_dir_reports_basename_collisions() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::create_dir_all(input.path().join("a")).unwrap();
    fs::create_dir_all(input.path().join("b")).unwrap();
    fs::write(input.path().join("a/types.proto"), "package a; message A {}").unwrap();
    fs::write(input.path().join("b/types.proto"), "package b; message B {}").unwrap();

    let mut failed = Vec::new();
    let summary = compile_dir(input.path(), output.path(), |event| {
        if let Event::Failed { file_id, error } = event {
            failed.push((file_id.to_string(), error.to_string()));
        }
    })
    .unwrap();

    assert_eq!(summary.generated, 1);
    assert_eq!(summary.failures, 1);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "b/types.proto");
    assert!(failed[0].1.contains("a/types.proto"), "{}", failed[0].1);
}

#[test]
fn test_compile_dir_requires_input_directory() {
    let output = tempfile::tempdir().unwrap();
    let missing = output.path().join("does-not-exist");
    let err = compile_dir(&missing, output.path(), |_| {}).unwrap_err();
    assert!(matches!(err, ProtoError::InvalidInput(_)), "{:?}", err);
}
