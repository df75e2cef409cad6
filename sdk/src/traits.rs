use serde::{de::DeserializeOwned, Serialize};

/// Implemented by every generated enum.
pub trait ProtoEnum: Copy + Default + 'static {
    /// The value's number in the schema.
    fn number(&self) -> i32;

    fn from_number(number: i32) -> Option<Self>;

    /// The value's name in the schema, e.g. `ACCESS_LEVEL_PRIVATE`.
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self>;
}

/// Carries rpc calls for generated service clients.
///
/// A client calls `transport.call("hdlctrl.v1.UserService", "GetTokenByPassword", &request)`;
/// how the request travels (HTTP, a queue, an in-process mock) is up to the implementation.
pub trait Transport {
    type Error;

    fn call<Req, Resp>(&self, service: &str, method: &str, request: &Req) -> Result<Resp, Self::Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn call<Req, Resp>(&self, service: &str, method: &str, request: &Req) -> Result<Resp, Self::Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        (**self).call(service, method, request)
    }
}
