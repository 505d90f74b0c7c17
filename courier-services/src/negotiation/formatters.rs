use std::io::{Read, Write};

use courier_core::negotiation::{MediaTypeFormatter, SerializationError};
use serde_json::Value;

fn map_json_error(e: serde_json::Error) -> SerializationError {
    if e.is_io() {
        SerializationError::Io(e.into())
    } else {
        SerializationError::Format(Box::new(e))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMediaTypeFormatter;

impl MediaTypeFormatter for JsonMediaTypeFormatter {
    fn supported_media_types(&self) -> &[&'static str] {
        &["application/json", "text/json"]
    }

    fn write_to_stream(
        &self,
        value: &Value,
        stream: &mut dyn Write,
    ) -> Result<(), SerializationError> {
        serde_json::to_writer(stream, value).map_err(map_json_error)
    }

    fn read_from_stream(&self, stream: &mut dyn Read) -> Result<Value, SerializationError> {
        serde_json::from_reader(stream).map_err(map_json_error)
    }
}

/// Writes scalar values as text; structured values are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextMediaTypeFormatter;

impl MediaTypeFormatter for PlainTextMediaTypeFormatter {
    fn supported_media_types(&self) -> &[&'static str] {
        &["text/plain"]
    }

    fn can_write(&self, value: &Value) -> bool {
        !matches!(value, Value::Array(_) | Value::Object(_))
    }

    fn write_to_stream(
        &self,
        value: &Value,
        stream: &mut dyn Write,
    ) -> Result<(), SerializationError> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => Ok(stream.write_all(s.as_bytes())?),
            Value::Bool(_) | Value::Number(_) => Ok(write!(stream, "{value}")?),
            Value::Array(_) | Value::Object(_) => Err(SerializationError::Unsupported(
                "text/plain can only represent scalar values".to_string(),
            )),
        }
    }

    fn read_from_stream(&self, stream: &mut dyn Read) -> Result<Value, SerializationError> {
        let mut text = String::new();
        stream.read_to_string(&mut text)?;
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write(formatter: &dyn MediaTypeFormatter, value: &Value) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        formatter.write_to_stream(value, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_json_written_body_reads_back_equal() {
        let value = json!({"id": 123, "email": "foo@bar.com", "tags": ["a", "b"]});
        let bytes = write(&JsonMediaTypeFormatter, &value).unwrap();
        let read = JsonMediaTypeFormatter
            .read_from_stream(&mut bytes.as_slice())
            .unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn test_json_rejects_malformed_input() {
        let err = JsonMediaTypeFormatter
            .read_from_stream(&mut &b"{\"id\":"[..])
            .unwrap_err();
        assert!(matches!(err, SerializationError::Format(_)));
        assert!(JsonMediaTypeFormatter.supports_media_type("TEXT/JSON"));
    }

    #[test]
    fn test_plain_text_scalars_only() {
        assert_eq!(write(&PlainTextMediaTypeFormatter, &json!("hi")).unwrap(), b"hi");
        assert_eq!(write(&PlainTextMediaTypeFormatter, &json!(4.5)).unwrap(), b"4.5");
        assert_eq!(write(&PlainTextMediaTypeFormatter, &json!(true)).unwrap(), b"true");
        assert!(matches!(
            write(&PlainTextMediaTypeFormatter, &json!([1])),
            Err(SerializationError::Unsupported(_))
        ));
        assert!(PlainTextMediaTypeFormatter.can_write(&json!("hi")));
        assert!(!PlainTextMediaTypeFormatter.can_write(&json!({"id": 1})));
        assert!(JsonMediaTypeFormatter.can_write(&json!({"id": 1})));
    }
}
