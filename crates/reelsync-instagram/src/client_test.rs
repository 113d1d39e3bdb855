use super::*;

fn test_client(base_url: &str) -> InstagramClient {
    InstagramClient::with_base_url("test-key", 15, 0, 0, base_url)
        .expect("client construction should not fail")
}

#[test]
fn endpoint_url_without_cursor() {
    let client = test_client("https://real-time-instagram-scraper-api1.p.rapidapi.com");
    let url = client.endpoint_url("v1/user_reels", "some_account", None);
    assert_eq!(
        url.as_str(),
        "https://real-time-instagram-scraper-api1.p.rapidapi.com/v1/user_reels?username_or_id=some_account"
    );
}

#[test]
fn endpoint_url_with_cursor() {
    let client = test_client("https://real-time-instagram-scraper-api1.p.rapidapi.com");
    let url = client.endpoint_url("v1/user_reels", "some_account", Some("QVFC123"));
    assert_eq!(
        url.as_str(),
        "https://real-time-instagram-scraper-api1.p.rapidapi.com/v1/user_reels?username_or_id=some_account&max_id=QVFC123"
    );
}

#[test]
fn endpoint_url_strips_trailing_slash_from_base() {
    let client = test_client("https://real-time-instagram-scraper-api1.p.rapidapi.com/");
    let url = client.endpoint_url("v1/user_info", "some_account", None);
    assert_eq!(
        url.as_str(),
        "https://real-time-instagram-scraper-api1.p.rapidapi.com/v1/user_info?username_or_id=some_account"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = InstagramClient::with_base_url("test-key", 15, 0, 0, "not a url");
    assert!(
        matches!(result, Err(InstagramError::InvalidBaseUrl { .. })),
        "expected InvalidBaseUrl"
    );
}
