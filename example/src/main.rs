// example/src/main.rs

use std::cell::RefCell;

use brine_proto::chrono::{TimeZone, Utc};
use brine_proto::Transport;
use serde::{de::DeserializeOwned, Serialize};

use example_app::common::AccessLevel;
use example_app::controller::{
    headless_host, ControllerServiceClient, HeadlessHost, HeadlessHostStatus, ListHeadlessHostRequest,
    StartWorldRequest, WorldStartParameters,
};

/// Answers every call with a canned JSON body and prints what was sent.
struct CannedTransport {
    responses: RefCell<Vec<serde_json::Value>>,
}

impl Transport for CannedTransport {
    type Error = serde_json::Error;

    fn call<Req, Resp>(&self, service: &str, method: &str, request: &Req) -> Result<Resp, Self::Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        println!("POST {}", brine_proto::method_path(service, method));
        println!("  request:  {}", serde_json::to_string(request)?);
        let response = self.responses.borrow_mut().remove(0);
        println!("  response: {}", response);
        serde_json::from_value(response)
    }
}

fn main() -> Result<(), serde_json::Error> {
    // Build a host by hand and look at its JSON form.
    let mut host = HeadlessHost {
        id: "host-1".to_string(),
        name: "Main headless".to_string(),
        status: HeadlessHostStatus::Running,
        account_id: Some("U-admin".to_string()),
        memory_usage: 3_221_225_472,
        tags: vec!["prod".to_string()],
        started_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        ..Default::default()
    };
    host.set_container_id("c0ffee".to_string());

    let json = serde_json::to_string_pretty(&host)?;
    println!("{}", json);

    let decoded: HeadlessHost = serde_json::from_str(&json)?;
    assert_eq!(decoded, host);
    assert_eq!(decoded.instance_case(), Some(headless_host::InstanceCase::ContainerId));

    // Drive the generated client with a transport that never leaves the process.
    let transport = CannedTransport {
        responses: RefCell::new(vec![
            serde_json::json!({ "hosts": [serde_json::to_value(&host)?] }),
            serde_json::json!({ "openedSession": { "id": "S-1", "accessLevel": "ACCESS_LEVEL_CONTACTS" } }),
        ]),
    };
    let client = ControllerServiceClient::new(&transport);

    let hosts = client.list_headless_host(&ListHeadlessHostRequest::default())?.hosts;
    println!("{} host(s), first is {:?}", hosts.len(), hosts[0].status);

    let started = client.start_world(&StartWorldRequest {
        host_id: hosts[0].id.clone(),
        parameters: Some(WorldStartParameters {
            session_name: Some("Friday meetup".to_string()),
            access_level: AccessLevel::Contacts,
            ..Default::default()
        }),
    })?;
    let session = started.opened_session.unwrap_or_default();
    println!("opened session {} ({})", session.id, session.access_level.as_str_name());

    Ok(())
}
