use serde_json::json;
use std::time::Duration;
use templi_common::services::{BillingProvider, CheckoutSessionParams, PageRequest};
use templi_config::{CircuitBreakerSettings, StripeConfig};
use templi_stripe::{CircuitState, StripeBillingService, StripeError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> StripeConfig {
    StripeConfig {
        api_base: server.uri(),
        secret_key: Some("sk_test_123".to_string()),
        ..StripeConfig::default()
    }
}

fn checkout_params() -> CheckoutSessionParams {
    CheckoutSessionParams {
        user_id: "u1".to_string(),
        price_id: "price_pro".to_string(),
        success_url: "https://ext.example/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
        cancel_url: "https://ext.example/cancel".to_string(),
    }
}

#[tokio::test]
async fn test_checkout_session_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Basic c2tfdGVzdF8xMjM6"))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_pro"))
        .and(body_string_contains("line_items%5B0%5D%5Bquantity%5D=1"))
        .and(body_string_contains("client_reference_id=u1"))
        .and(body_string_contains("metadata%5BuserId%5D=u1"))
        .and(body_string_contains("subscription_data%5Bmetadata%5D%5BuserId%5D=u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&config_for(&server)).unwrap();
    let session = service
        .create_checkout_session(checkout_params())
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_1");
    assert_eq!(session.url, "https://checkout.stripe.com/c/pay/cs_test_1");
}

#[tokio::test]
async fn test_checkout_session_without_url_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cs_test_2" })))
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&config_for(&server)).unwrap();
    let err = service
        .create_checkout_session(checkout_params())
        .await
        .unwrap_err();
    assert!(matches!(err, StripeError::MissingCheckoutUrl));
}

#[tokio::test]
async fn test_stripe_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "No such price: 'price_pro'", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&config_for(&server)).unwrap();
    let err = service
        .create_checkout_session(checkout_params())
        .await
        .unwrap_err();
    match err {
        StripeError::ApiError {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 400);
            assert_eq!(message, "No such price: 'price_pro'");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // A rejected request does not count against the provider
    assert_eq!(service.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_list_active_subscriptions_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .and(query_param("status", "active"))
        .and(query_param("limit", "100"))
        .and(query_param("starting_after", "sub_050"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": true,
            "data": [
                { "id": "sub_051", "status": "active", "metadata": { "userId": "u1" } },
                { "id": "sub_052", "status": "active", "metadata": {} }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&config_for(&server)).unwrap();
    let page = service
        .list_active_subscriptions(PageRequest {
            limit: 100,
            starting_after: Some("sub_050".to_string()),
        })
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].metadata_user_id(), Some("u1"));
    assert_eq!(page.records[1].metadata_user_id(), None);
}

#[tokio::test]
async fn test_search_active_subscriptions_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/search"))
        .and(query_param(
            "query",
            "status:'active' AND metadata['userId']:'u1'",
        ))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "search_result",
            "has_more": false,
            "data": [{ "id": "sub_123", "status": "active", "metadata": { "userId": "u1" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&config_for(&server)).unwrap();
    let page = service.search_active_subscriptions("u1", 10).await.unwrap();
    assert_eq!(page.records[0].id, "sub_123");
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(2)
        .mount(&server)
        .await;

    let config = StripeConfig {
        circuit_breaker: CircuitBreakerSettings {
            enabled: true,
            failure_threshold: 2,
            open_duration_secs: 60,
        },
        ..config_for(&server)
    };
    let service = StripeBillingService::new(&config).unwrap();
    let page = || PageRequest {
        limit: 10,
        starting_after: None,
    };

    for _ in 0..2 {
        let err = service.list_active_subscriptions(page()).await.unwrap_err();
        assert!(matches!(err, StripeError::ApiError { status_code: 503, .. }));
    }
    assert_eq!(service.circuit_state(), CircuitState::Open);

    // Fails fast; the mock's expect(2) verifies nothing else reached the server
    let err = service.list_active_subscriptions(page()).await.unwrap_err();
    assert!(matches!(err, StripeError::CircuitOpen));
}

#[tokio::test]
async fn test_missing_secret_key_never_calls_stripe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = StripeConfig {
        secret_key: None,
        ..config_for(&server)
    };
    let service = StripeBillingService::new(&config).unwrap();
    let err = service
        .create_checkout_session(checkout_params())
        .await
        .unwrap_err();
    assert!(matches!(err, StripeError::ConfigError(_)));
}

fn fragile_breaker(server: &MockServer) -> StripeConfig {
    StripeConfig {
        circuit_breaker: CircuitBreakerSettings {
            enabled: true,
            failure_threshold: 1,
            open_duration_secs: 0,
        },
        ..config_for(server)
    }
}

fn empty_list() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "object": "list", "has_more": false, "data": [] }))
}

#[tokio::test]
async fn test_cancelled_half_open_trial_does_not_wedge_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .respond_with(empty_list().set_delay(Duration::from_millis(500)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .respond_with(empty_list())
        .mount(&server)
        .await;

    let service = StripeBillingService::new(&fragile_breaker(&server)).unwrap();
    let page = || PageRequest {
        limit: 10,
        starting_after: None,
    };

    let err = service.list_active_subscriptions(page()).await.unwrap_err();
    assert!(matches!(err, StripeError::ApiError { status_code: 503, .. }));
    assert_eq!(service.circuit_state(), CircuitState::HalfOpen);

    // The trial call is abandoned mid-flight, as when the client disconnects
    let trial = tokio::time::timeout(
        Duration::from_millis(50),
        service.list_active_subscriptions(page()),
    )
    .await;
    assert!(trial.is_err());

    let page_after = service.list_active_subscriptions(page()).await.unwrap();
    assert!(page_after.records.is_empty());
    assert_eq!(service.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_unreadable_success_body_counts_as_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let config = StripeConfig {
        circuit_breaker: CircuitBreakerSettings {
            open_duration_secs: 60,
            ..fragile_breaker(&server).circuit_breaker
        },
        ..config_for(&server)
    };
    let service = StripeBillingService::new(&config).unwrap();
    let err = service
        .list_active_subscriptions(PageRequest {
            limit: 10,
            starting_after: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, StripeError::ParseError(_)));
    assert_eq!(service.circuit_state(), CircuitState::Open);
}
