use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;

const GREETING: &str = "Hello world v1!";

#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    status_code: i32,
    body: String,
}

/// Body layout: `message` is always written before `input`.
#[derive(Serialize)]
struct Greeting<'a> {
    message: &'a str,
    input: &'a Value,
}

/// Builds the greeting response for `event`, echoing it back verbatim.
///
/// The body is pretty-printed with two-space indentation. Object keys inside
/// the echoed event keep their original order.
pub(crate) fn greet(event: &Value) -> Result<Response, serde_json::Error> {
    let body = serde_json::to_string_pretty(&Greeting {
        message: GREETING,
        input: event,
    })?;

    Ok(Response {
        status_code: 200,
        body,
    })
}

pub(crate) async fn function_handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    tracing::debug!(request_id = %event.context.request_id, "greeting");

    Ok(greet(&event.payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_runtime::Context;
    use serde_json::json;

    fn body_of(event: Value) -> Value {
        let response = greet(&event).expect("failed to build response");
        serde_json::from_str(&response.body).expect("body is not valid json")
    }

    #[test]
    fn echoes_scenarios() {
        for event in [json!({}), json!({"name": "Ada"}), json!(null), json!(42), json!("text")] {
            assert_eq!(
                body_of(event.clone()),
                json!({ "message": "Hello world v1!", "input": event })
            );
        }
    }

    #[test]
    fn body_has_exactly_message_and_input() {
        let body = body_of(json!({"message": "spoofed", "extra": [1, 2, 3]}));
        let keys: Vec<&str> = body
            .as_object()
            .expect("body is not an object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["message", "input"]);
        assert_eq!(body["message"], "Hello world v1!");
    }

    #[test]
    fn pretty_prints_with_two_spaces() {
        let response = greet(&json!({})).unwrap();
        assert_eq!(
            response.body,
            "{\n  \"message\": \"Hello world v1!\",\n  \"input\": {}\n}"
        );

        let response = greet(&json!({"name": "Ada"})).unwrap();
        assert_eq!(
            response.body,
            "{\n  \"message\": \"Hello world v1!\",\n  \"input\": {\n    \"name\": \"Ada\"\n  }\n}"
        );
    }

    #[test]
    fn keeps_input_key_order() {
        let event: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let body = body_of(event);
        let keys: Vec<&str> = body["input"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn body_is_stable_under_reserialization() {
        for fixture in [
            include_str!("../tests/data/apigw_proxy.json"),
            include_str!("../tests/data/nested.json"),
        ] {
            let event: Value = serde_json::from_str(fixture).expect("failed to parse fixture");
            let response = greet(&event).unwrap();
            let reparsed: Value = serde_json::from_str(&response.body).unwrap();
            assert_eq!(serde_json::to_string_pretty(&reparsed).unwrap(), response.body);
            assert_eq!(reparsed["input"], event);
        }
    }

    #[test]
    fn serializes_status_code_in_camel_case() {
        let response = greet(&json!(null)).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "statusCode": 200,
                "body": "{\n  \"message\": \"Hello world v1!\",\n  \"input\": null\n}"
            })
        );
    }

    #[tokio::test]
    async fn handler_answers_apigw_event() {
        let payload: Value = serde_json::from_str(include_str!("../tests/data/apigw_proxy.json"))
            .expect("failed to parse apigw event");
        let event = LambdaEvent::new(payload.clone(), Context::default());

        let response = function_handler(event).await.expect("handler failed");

        assert_eq!(response.status_code, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["message"], "Hello world v1!");
        assert_eq!(body["input"], payload);
    }
}
