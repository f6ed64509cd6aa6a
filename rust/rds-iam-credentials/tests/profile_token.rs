//! Generates tokens from credentials stored in profile files on disk.

use chrono::DateTime;
use rds_iam_credentials::{
    AuthTokenGenerator, CredentialsError, DefaultRegionProviderChain, Env,
    ProfileCredentialsProvider, ProfileFiles, ProvideRegion, SigningContext, TokenError,
};
use std::sync::Arc;
use testresult::TestResult;

const CONFIG: &str = "\
[profile analytics]
region = eu-west-1

[profile auditor]
role_arn = arn:aws:iam::123456789012:role/auditor
source_profile = analytics
";

const CREDENTIALS: &str = "\
[analytics]
aws_access_key_id = drjekyll
aws_secret_access_key = mrhyde
";

fn profile_files(dir: &tempfile::TempDir) -> TestResult<ProfileFiles> {
    let config = dir.path().join("config");
    let credentials = dir.path().join("credentials");
    std::fs::write(&config, CONFIG)?;
    std::fs::write(&credentials, CREDENTIALS)?;
    Ok(ProfileFiles::new(config, credentials))
}

fn regions(files: ProfileFiles) -> DefaultRegionProviderChain {
    DefaultRegionProviderChain::new(Env::from_slice(&[]), files).without_instance_metadata()
}

#[test]
fn it_signs_with_profile_credentials_and_region() -> TestResult {
    let dir = tempfile::tempdir()?;
    let files = profile_files(&dir)?;

    let region = regions(files.clone())
        .region("analytics")?
        .expect("profile defines a region");
    let generator = AuthTokenGenerator::new(Arc::new(ProfileCredentialsProvider::new(files)));
    let issued_at = DateTime::from_timestamp(1_740_690_000, 0).unwrap();

    let token = generator.generate(&SigningContext::new(
        "mysql", 3306, "root", &region, "analytics", issued_at,
    ))?;

    assert_eq!(region, "eu-west-1");
    assert!(
        token
            .as_str()
            .starts_with("mysql:3306/?Action=connect&DBUser=root&")
    );
    assert!(token.as_str().contains(
        "X-Amz-Credential=drjekyll%2F20250227%2Feu-west-1%2Frds-db%2Faws4_request"
    ));
    assert!(token.as_str().contains("&X-Amz-Signature="));
    Ok(())
}

#[test]
fn it_takes_the_region_of_a_role_profile_from_its_source() -> TestResult {
    let dir = tempfile::tempdir()?;

    let region = regions(profile_files(&dir)?).region("auditor")?;

    assert_eq!(region.as_deref(), Some("eu-west-1"));
    Ok(())
}

#[test]
fn it_surfaces_missing_profiles() -> TestResult {
    let dir = tempfile::tempdir()?;
    let generator =
        AuthTokenGenerator::new(Arc::new(ProfileCredentialsProvider::new(profile_files(&dir)?)));
    let issued_at = DateTime::from_timestamp(0, 0).unwrap();

    let error = generator
        .generate(&SigningContext::new("db", 3306, "root", "us-east-1", "missing", issued_at))
        .unwrap_err();

    assert!(matches!(
        error,
        TokenError::Credentials(CredentialsError::Provider { ref profile, .. }) if profile == "missing"
    ));
    assert!(
        error
            .to_string()
            .starts_with("failed to load credentials for profile `missing`")
    );
    Ok(())
}
