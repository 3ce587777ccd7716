//! Integration tests for site extractors against mock APIs.

use metamaster_core::extractor::{
    DanbooruExtractor, ExtractOutcome, Extractor, ExtractorCredentials, ExtractorError,
    GelbooruExtractor, MetadataResult, MoebooruExtractor, Rating, build_default_extractor_registry,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn found(outcome: ExtractOutcome) -> MetadataResult {
    match outcome {
        ExtractOutcome::Found(result) => result,
        ExtractOutcome::Absent => panic!("expected metadata, got Absent"),
    }
}

#[tokio::test]
async fn test_danbooru_normalizes_categories() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts/4242.json"))
        .and(query_param("login", "me"))
        .and(query_param("api_key", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4242,
            "tag_string_character": "hatsune_miku",
            "tag_string_artist": "someone",
            "tag_string_meta": "highres",
            "tag_string_copyright": "vocaloid",
            "tag_string_general": "1girl long_hair",
            "source": "https://twitter.com/someone/status/1",
            "rating": "g"
        })))
        .mount(&server)
        .await;

    let extractor =
        DanbooruExtractor::with_base_url(server.uri(), Some("me".into()), Some("k".into())).unwrap();
    let result = found(
        extractor
            .fetch_metadata("https://danbooru.donmai.us/post/show/4242")
            .await
            .unwrap(),
    );

    assert_eq!(
        result.tags,
        vec![
            "character:hatsune_miku",
            "artist:someone",
            "meta:highres",
            "series:vocaloid",
            "1girl",
            "long_hair",
            "meta:danbooru"
        ]
    );
    assert_eq!(result.source, "https://twitter.com/someone/status/1");
    assert_eq!(result.rating, Rating::Safe);
}

#[tokio::test]
async fn test_danbooru_missing_post_is_absent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts/1.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let extractor = DanbooruExtractor::with_base_url(server.uri(), None, None).unwrap();
    let outcome = extractor
        .fetch_metadata("https://danbooru.donmai.us/posts/1")
        .await
        .unwrap();
    assert_eq!(outcome, ExtractOutcome::Absent);
}

#[tokio::test]
async fn test_danbooru_server_error_is_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/posts/1.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let extractor = DanbooruExtractor::with_base_url(server.uri(), None, None).unwrap();
    let err = extractor
        .fetch_metadata("https://danbooru.donmai.us/posts/1")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractorError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_gelbooru_reads_id_query_and_falls_back_source() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("page", "dapi"))
        .and(query_param("id", "777"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@attributes": {"count": 1},
            "post": [{"id": 777, "tags": "cat  dog", "source": "", "rating": "sensitive"}]
        })))
        .mount(&server)
        .await;

    let extractor = GelbooruExtractor::with_base_url(server.uri(), None, None).unwrap();
    let result = found(
        extractor
            .fetch_metadata("https://gelbooru.com/index.php?page=post&s=view&id=777")
            .await
            .unwrap(),
    );

    assert_eq!(result.tags, vec!["cat", "dog", "meta:gelbooru"]);
    assert_eq!(
        result.source,
        "https://gelbooru.com/index.php?page=post&s=view&id=777"
    );
    assert_eq!(result.rating, Rating::Questionable);
}

#[tokio::test]
async fn test_gelbooru_empty_response_is_absent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@attributes": {"count": 0}})))
        .mount(&server)
        .await;

    let extractor = GelbooruExtractor::with_base_url(server.uri(), None, None).unwrap();
    let outcome = extractor
        .fetch_metadata("https://gelbooru.com/index.php?page=post&s=view&id=1")
        .await
        .unwrap();
    assert_eq!(outcome, ExtractOutcome::Absent);
}

#[tokio::test]
async fn test_yandere_queries_by_id_tag() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/post.json"))
        .and(query_param("tags", "id:555"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 555, "tags": "scenery sky", "source": "https://pixiv.net/artworks/9", "rating": "s"}
        ])))
        .mount(&server)
        .await;

    let extractor = MoebooruExtractor::yandere().unwrap().with_base_url(server.uri());
    let result = found(
        extractor
            .fetch_metadata("https://yande.re/post/show/555")
            .await
            .unwrap(),
    );

    assert_eq!(result.tags, vec!["scenery", "sky", "meta:yandere"]);
    assert_eq!(result.source, "https://pixiv.net/artworks/9");
    assert_eq!(result.rating, Rating::Safe);
}

#[tokio::test]
async fn test_konachan_missing_post_is_absent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/post.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let extractor = MoebooruExtractor::konachan().unwrap().with_base_url(server.uri());
    let outcome = extractor
        .fetch_metadata("https://konachan.com/post/show/1")
        .await
        .unwrap();
    assert_eq!(outcome, ExtractOutcome::Absent);
}

#[test]
fn test_default_registry_routes_hosts() {
    let registry = build_default_extractor_registry(&ExtractorCredentials::default());

    let name_for = |url: &str| registry.find_for_url(url).map(|e| e.name().to_string());
    assert_eq!(
        name_for("https://danbooru.donmai.us/posts/1").as_deref(),
        Some("danbooru")
    );
    assert_eq!(name_for("https://yande.re/post/show/1").as_deref(), Some("yandere"));
    assert_eq!(
        name_for("https://gelbooru.com/index.php?id=1").as_deref(),
        Some("gelbooru")
    );
    assert_eq!(name_for("https://konachan.com/post/show/1").as_deref(), Some("konachan"));
    assert_eq!(name_for("https://example.com/1"), None);
}
