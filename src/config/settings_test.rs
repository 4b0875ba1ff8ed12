use super::*;

#[test]
fn test_defaults_without_environment() {
    let settings = Settings::load(Some(Map::new())).unwrap();

    assert_eq!(settings.redis.url, "redis://localhost:6379/0");
    assert_eq!(settings.crawler.user_agent, "parser-generator/1.0");
    assert_eq!(settings.crawler.prefix_url_cap, 20);
    assert_eq!(settings.crawler.requeue_delay_secs, 30);
    assert_eq!(settings.synthesis.paused_backoff_ms, 5000);
    assert_eq!(settings.synthesis.configs_dir, PathBuf::from("configs"));
    assert!(settings.llm.api_key.is_none());
    assert_eq!(settings.llm.timeout(), Duration::from_secs(120));
}

#[test]
fn test_environment_overrides_defaults() {
    let mut env = Map::new();
    env.insert("PARSEGEN__REDIS__URL".to_string(), "redis://cache:6379/2".to_string());
    env.insert("PARSEGEN__CRAWLER__PREFIX_URL_CAP".to_string(), "5".to_string());
    env.insert("PARSEGEN__LLM__API_KEY".to_string(), "sk-test".to_string());

    let settings = Settings::load(Some(env)).unwrap();

    assert_eq!(settings.redis.url, "redis://cache:6379/2");
    assert_eq!(settings.crawler.prefix_url_cap, 5);
    assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
}

#[test]
fn test_frontier_policy_from_crawler_settings() {
    let settings = Settings::load(Some(Map::new())).unwrap();
    let policy = settings.crawler.frontier_policy();
    assert_eq!(policy, FrontierPolicy::default());
    assert_eq!(settings.crawler.fetch_timeout(), Duration::from_secs(30));
}
