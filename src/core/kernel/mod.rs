/// Swirl Kernel - transport-level building blocks for query-protocol calls
///
/// The kernel contains everything that sits between a flat parameter set
/// and a stream of parse events. It knows nothing about specific actions or
/// response shapes.
///
/// # Architecture
///
/// ## Transport Layer
/// - `HttpTransport`: pluggable form-POST interface returning a streamed body
/// - `ReqwestTransport`: default implementation over reqwest
///
/// ## Authentication
/// - `Signer`: pluggable signing interface
/// - `HmacSigner`: Signature Version 2, HMAC-SHA256
///
/// ## Encoding
/// - `codec`: form encoding shared by request bodies and signatures
/// - `xml`: streaming tokenizer feeding `XmlEventSink`s
///
/// # Example
///
/// ```rust,no_run
/// use swirl::core::kernel::*;
/// use swirl::core::types::ExpandedParams;
/// use secrecy::Secret;
///
/// # async fn example() -> Result<(), swirl::QueryError> {
/// let signer = HmacSigner::new(
///     "AKIDEXAMPLE".to_string(),
///     Secret::new("secret".to_string()),
///     "ec2.amazonaws.com".to_string(),
/// );
///
/// let mut params = ExpandedParams::new();
/// params.insert("Action".to_string(), "DescribeRegions".to_string());
/// let signature = signer.sign(&params)?;
/// params.insert("Signature".to_string(), signature);
///
/// let transport = ReqwestTransport::new()?;
/// let body = form_encode(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
/// let response = transport
///     .post_form(FormRequest::new("ec2.amazonaws.com", body))
///     .await?;
/// println!("status {}", response.status);
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod xml;

pub use codec::{encode_component, form_encode};
pub use rest::{
    ByteStream, FormRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportBuilder,
    TransportConfig,
};
pub use signer::{HmacSigner, Signer};
pub use xml::{drive_events, XmlEvent, XmlEventSink};
