use crate::core::errors::QueryError;
use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::io::AsyncBufRead;
use tracing::{instrument, trace};

/// Parse events, as a push-style tokenizer reports them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Opening tag, local name only
    StartElement(String),
    /// Unescaped character data, possibly one of several pieces for a node
    Characters(String),
    /// Closing tag, local name only
    EndElement(String),
    /// The input is exhausted
    EndDocument,
}

/// Consumer of parse events
pub trait XmlEventSink {
    fn on_event(&mut self, event: XmlEvent) -> Result<(), QueryError>;
}

/// Tokenize `source` and push every event into `sink`
///
/// Bytes are pulled from the reader as the tokenizer needs them, so a
/// reader over a network stream is parsed while the response is still
/// arriving. `EndDocument` is delivered exactly once, after the last byte.
#[instrument(skip_all)]
pub async fn drive_events<R, S>(source: R, sink: &mut S) -> Result<(), QueryError>
where
    R: AsyncBufRead + Unpin,
    S: XmlEventSink + ?Sized,
{
    // Text is left untrimmed; whitespace handling belongs to the consumer.
    let mut reader = Reader::from_reader(source);

    let mut buf = Vec::new();
    let mut count: usize = 0;

    loop {
        match reader.read_event_into_async(&mut buf).await? {
            Event::Start(e) => {
                sink.on_event(XmlEvent::StartElement(element_name(
                    e.local_name().as_ref(),
                )?))?;
            }
            Event::Empty(e) => {
                let name = element_name(e.local_name().as_ref())?;
                sink.on_event(XmlEvent::StartElement(name.clone()))?;
                sink.on_event(XmlEvent::EndElement(name))?;
            }
            Event::End(e) => {
                sink.on_event(XmlEvent::EndElement(element_name(
                    e.local_name().as_ref(),
                )?))?;
            }
            Event::Text(e) => {
                sink.on_event(XmlEvent::Characters(e.unescape()?.into_owned()))?;
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e).map_err(|err| {
                    QueryError::MalformedResponse(format!("CDATA is not UTF-8: {}", err))
                })?;
                sink.on_event(XmlEvent::Characters(text.to_string()))?;
            }
            Event::Eof => {
                sink.on_event(XmlEvent::EndDocument)?;
                break;
            }
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
        count += 1;
        buf.clear();
    }

    trace!(events = count, "XML document consumed");
    Ok(())
}

fn element_name(raw: &[u8]) -> Result<String, QueryError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| QueryError::MalformedResponse(format!("element name is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio_util::io::StreamReader;

    #[derive(Default)]
    struct Recorder {
        events: Vec<XmlEvent>,
    }

    impl XmlEventSink for Recorder {
        fn on_event(&mut self, event: XmlEvent) -> Result<(), QueryError> {
            self.events.push(event);
            Ok(())
        }
    }

    impl Recorder {
        fn text(&self) -> String {
            self.events
                .iter()
                .filter_map(|e| match e {
                    XmlEvent::Characters(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_events_in_document_order() {
        let xml = br#"<?xml version="1.0"?><a><b>1</b><c/></a>"#;
        let mut recorder = Recorder::default();
        drive_events(&xml[..], &mut recorder).await.unwrap();

        assert_eq!(
            recorder.events,
            vec![
                XmlEvent::StartElement("a".to_string()),
                XmlEvent::StartElement("b".to_string()),
                XmlEvent::Characters("1".to_string()),
                XmlEvent::EndElement("b".to_string()),
                XmlEvent::StartElement("c".to_string()),
                XmlEvent::EndElement("c".to_string()),
                XmlEvent::EndElement("a".to_string()),
                XmlEvent::EndDocument,
            ]
        );
    }

    #[tokio::test]
    async fn test_namespace_prefix_is_stripped() {
        let xml = br#"<ec2:Resp xmlns:ec2="http://ec2.amazonaws.com/doc/2009-11-30/"><ec2:x>1</ec2:x></ec2:Resp>"#;
        let mut recorder = Recorder::default();
        drive_events(&xml[..], &mut recorder).await.unwrap();

        assert_eq!(recorder.events[0], XmlEvent::StartElement("Resp".to_string()));
        assert_eq!(recorder.events[1], XmlEvent::StartElement("x".to_string()));
    }

    #[tokio::test]
    async fn test_entities_and_cdata_become_characters() {
        let xml = b"<a>x &amp; y <![CDATA[<raw>]]></a>";
        let mut recorder = Recorder::default();
        drive_events(&xml[..], &mut recorder).await.unwrap();

        assert_eq!(recorder.text(), "x & y <raw>");
    }

    #[tokio::test]
    async fn test_chunked_input_is_parsed_incrementally() {
        let xml = "<Resp><reservationSet><item><id>r-1</id></item></reservationSet></Resp>";
        let chunks: Vec<Result<Bytes, std::io::Error>> = xml
            .as_bytes()
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let reader = StreamReader::new(futures::stream::iter(chunks));

        let mut recorder = Recorder::default();
        drive_events(reader, &mut recorder).await.unwrap();

        assert_eq!(recorder.text(), "r-1");
        assert_eq!(recorder.events.last(), Some(&XmlEvent::EndDocument));
        assert_eq!(
            recorder
                .events
                .iter()
                .filter(|e| matches!(e, XmlEvent::StartElement(_)))
                .count(),
            4
        );
    }

    #[tokio::test]
    async fn test_mismatched_tags_are_malformed() {
        let xml = b"<a><b></a>";
        let mut recorder = Recorder::default();
        let err = drive_events(&xml[..], &mut recorder).await.unwrap_err();

        assert!(matches!(err, QueryError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_stream_failure_is_transport_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"<a><b>")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
        ];
        let reader = StreamReader::new(futures::stream::iter(chunks));

        let mut recorder = Recorder::default();
        let err = drive_events(reader, &mut recorder).await.unwrap_err();

        assert!(matches!(err, QueryError::TransportError(_)));
    }
}
