//! Library API integration tests
use ladle_core::*;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

#[test]
fn test_extract_recipe_fields() {
    let html = read_fixture("recipe.html");
    let extractor = Extractor::new(
        r#"h1, [data-testid="BodyWrapper"], [data-testid="IngredientList"], [data-testid="InstructionsWrapper"]"#,
    )
    .unwrap();
    let extraction = extractor.extract_str(&html).unwrap();

    assert_eq!(extraction.len(), 4);
    assert_eq!(extraction.get("h1").unwrap(), ["Spicy Noodle Soup"]);
    assert_eq!(
        extraction.get(r#"[data-testid="BodyWrapper"]"#).unwrap(),
        ["A warming bowl for cold nights, ready in under thirty minutes."]
    );
    assert_eq!(
        extraction.get(r#"[data-testid="IngredientList"]"#).unwrap(),
        ["Ingredients 8 oz. rice noodles 4 cups chicken broth 2 Tbsp. chili crisp"]
    );
    assert_eq!(
        extraction.get(r#"[data-testid="InstructionsWrapper"]"#).unwrap(),
        ["Bring the broth to a simmer. Cook the noodles in the broth until tender, about 5 minutes. Stir in the chili crisp and serve."]
    );
}

#[test]
fn test_each_matching_element_is_a_block() {
    let html = read_fixture("recipe.html");
    let extraction = Extractor::new("li.step, p.note").unwrap().extract_str(&html).unwrap();

    assert_eq!(
        extraction.get("li.step").unwrap(),
        [
            "Bring the broth to a simmer.",
            "Cook the noodles in the broth until tender, about 5 minutes.",
            "Stir in the chili crisp and serve.",
        ]
    );
    assert_eq!(extraction.get("p.note").unwrap(), ["Leftovers keep for 3 days."]);
}

#[test]
fn test_reader_matches_in_memory() {
    let html = read_fixture("recipe.html");
    let extractor = Extractor::new("h1, li, p").unwrap().chunk_size(7);

    let from_str = extractor.extract_str(&html).unwrap();
    let from_reader = extractor.extract_reader(html.as_bytes()).unwrap();

    assert_eq!(from_str, from_reader);
    assert_eq!(from_str.get("li").unwrap().len(), 6);
}

#[test]
fn test_structured_data_is_raw_json() {
    let html = read_fixture("recipe.html");
    let extraction = Extractor::from_profile(&Profile::epicurious()).unwrap().extract_str(&html).unwrap();

    let raw = extraction.first("structured_data").unwrap();
    let value: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(value["@type"], "Recipe");
}

#[test]
fn test_recipe_projection() {
    let html = read_fixture("recipe.html");
    let extraction = Extractor::from_profile(&Profile::epicurious()).unwrap().extract_str(&html).unwrap();
    let recipe = Recipe::from_extraction(&extraction, "https://www.epicurious.com/recipes/spicy-noodle-soup");

    assert_eq!(recipe.title.as_deref(), Some("Spicy Noodle Soup"));
    assert!(recipe.ingredients_raw.unwrap().contains("rice noodles"));
    assert!(recipe.steps_raw.unwrap().starts_with("Bring the broth"));
    assert_eq!(recipe.image_url.as_deref(), Some("https://assets.example.com/photos/spicy-noodle-soup.jpg"));

    let json = serde_json::to_value(Recipe::from_extraction(&extraction, "u")).unwrap();
    assert_eq!(json["source_url"], "u");
}

#[test]
fn test_attribute_query() {
    let html = read_fixture("recipe.html");

    let src = AttributeQuery::new("img.hero", "src").unwrap().extract_str(&html).unwrap();
    assert_eq!(src, "https://assets.example.com/photos/spicy-noodle-soup.jpg");

    let og = AttributeQuery::new(r#"meta[property="og:image"]"#, "content").unwrap().extract_str(&html).unwrap();
    assert_eq!(og, "https://assets.example.com/photos/spicy-noodle-soup.jpg");

    let missing = AttributeQuery::new("video", "src").unwrap().extract_str(&html).unwrap();
    assert_eq!(missing, "");
}

#[test]
fn test_spaced_option() {
    let html = read_fixture("recipe.html");
    let extraction = Extractor::new("li").unwrap().spaced(true).extract_str(&html).unwrap();
    assert_eq!(extraction.first("li"), Some("8 oz. rice noodles"));

    let compact = Extractor::new("span").unwrap().extract_str("<p><span>8 oz.</span><span>noodles</span></p>").unwrap();
    assert_eq!(compact.get("span").unwrap(), ["8 oz.", "noodles"]);
}

#[test]
fn test_edge_case_empty() {
    let html = read_fixture("empty_content.html");
    let extraction = Extractor::new("p, h1").unwrap().extract_str(&html).unwrap();

    assert!(extraction.get("p").unwrap().is_empty());
    assert!(extraction.get("h1").unwrap().is_empty());
    assert_eq!(extraction.block_count(), 0);
}

#[test]
fn test_edge_case_malformed() {
    let html = read_fixture("malformed_html.html");
    let extraction = Extractor::new("li, h1").unwrap().extract_str(&html).unwrap();

    assert_eq!(extraction.get("li").unwrap(), ["flour", "sugar", "eggs"]);
    assert_eq!(extraction.get("h1").unwrap(), ["Unclosed title"]);
}

#[test]
fn test_invalid_selector_error() {
    match Extractor::new("h1, article p") {
        Err(LadleError::InvalidSelector { selector, .. }) => assert_eq!(selector, "article p"),
        other => panic!("expected selector error, got {other:?}"),
    }
}

#[test]
fn test_profile_loader_api() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("example.com.txt"), "title: h1\nsteps_raw: li.step\n").unwrap();

    let mut loader = ProfileLoader::builder().custom_dir(dir.path()).build();
    let profile = loader.load_for_url("https://example.com/soup").unwrap().unwrap();
    let extraction = Extractor::from_profile(&profile).unwrap().extract_str(&read_fixture("recipe.html")).unwrap();

    assert_eq!(extraction.keys().collect::<Vec<_>>(), vec!["title", "steps_raw"]);
    assert_eq!(extraction.get("steps_raw").unwrap().len(), 3);
}
