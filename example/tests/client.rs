use std::cell::RefCell;

use brine_proto::Transport;
use pretty_assertions::assert_eq;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use example_app::common::AccessLevel;
use example_app::controller::{
    ControllerServiceClient, HeadlessHostStatus, ListHeadlessHostRequest, StartWorldRequest,
    WorldStartParameters,
};
use example_app::user::{GetTokenByPasswordRequest, UserServiceClient};

#[derive(Debug, PartialEq)]
struct Call {
    service: String,
    method:  String,
    body:    Value,
}

#[derive(Default)]
struct MockTransport {
    calls:     RefCell<Vec<Call>>,
    responses: RefCell<Vec<Value>>,
}

impl MockTransport {
    fn replying(responses: Vec<Value>) -> Self {
        MockTransport {
            calls:     RefCell::new(Vec::new()),
            responses: RefCell::new(responses),
        }
    }
}

impl Transport for MockTransport {
    type Error = serde_json::Error;

    fn call<Req, Resp>(&self, service: &str, method: &str, request: &Req) -> Result<Resp, Self::Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.calls.borrow_mut().push(Call {
            service: service.to_string(),
            method:  method.to_string(),
            body:    serde_json::to_value(request)?,
        });
        serde_json::from_value(self.responses.borrow_mut().remove(0))
    }
}

#[test]
fn test_controller_client() {
    let transport = MockTransport::replying(vec![
        json!({ "hosts": [{ "id": "h1", "status": "HEADLESS_HOST_STATUS_STARTING" }, { "id": "h2" }] }),
        json!({ "openedSession": { "id": "S-9", "accessLevel": "ACCESS_LEVEL_ANYONE", "usersCount": 1 } }),
    ]);
    let client = ControllerServiceClient::new(&transport);
    assert_eq!(ControllerServiceClient::<&MockTransport>::SERVICE_NAME, "hdlctrl.v1.ControllerService");

    let hosts = client.list_headless_host(&ListHeadlessHostRequest::default()).unwrap().hosts;
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].status, HeadlessHostStatus::Starting);
    assert_eq!(hosts[1].status, HeadlessHostStatus::Unspecified);

    let response = client
        .start_world(&StartWorldRequest {
            host_id:    "h1".to_string(),
            parameters: Some(WorldStartParameters {
                session_name: Some("Friday".to_string()),
                access_level: AccessLevel::Contacts,
                load_world_url: Some("resrec:///G-1/R-1".to_string()),
                ..Default::default()
            }),
        })
        .unwrap();
    let session = response.opened_session.unwrap();
    assert_eq!(session.id, "S-9");
    assert_eq!(session.access_level, AccessLevel::Anyone);
    assert_eq!(session.users_count, 1);

    let calls = transport.calls.borrow();
    assert_eq!(
        *calls,
        vec![
            Call {
                service: "hdlctrl.v1.ControllerService".to_string(),
                method:  "ListHeadlessHost".to_string(),
                body:    json!({}),
            },
            Call {
                service: "hdlctrl.v1.ControllerService".to_string(),
                method:  "StartWorld".to_string(),
                body:    json!({
                    "hostId": "h1",
                    "parameters": {
                        "sessionName": "Friday",
                        "maxUsers": null,
                        "accessLevel": "ACCESS_LEVEL_CONTACTS",
                        "loadWorldUrl": "resrec:///G-1/R-1",
                        "loadWorldPresetName": null
                    }
                }),
            },
        ]
    );
}

#[test]
fn test_user_client_surfaces_transport_errors() {
    let transport = MockTransport::replying(vec![json!({ "token": "jwt", "expiresAt": "not a time" })]);
    let client = UserServiceClient::new(transport);

    let err = client
        .get_token_by_password(&GetTokenByPasswordRequest {
            id:       "admin".to_string(),
            password: "secret".to_string(),
        })
        .unwrap_err();
    assert!(err.to_string().contains("invalid timestamp"), "{}", err);

    let transport = client.into_inner();
    assert_eq!(transport.calls.borrow()[0].method, "GetTokenByPassword");
    assert_eq!(transport.calls.borrow()[0].body, json!({ "id": "admin", "password": "secret" }));
}
