//! Build information of the docker-compose binary

use compose_update::VersionInfo;

/// Version the binary reports and compares against the release feed
pub const VERSION: &str = match option_env!("COMPOSE_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Version, commit and build date stamped by the build script
pub fn build_info() -> VersionInfo {
    VersionInfo {
        version: VERSION.to_string(),
        commit: option_env!("GIT_SHA").map(String::from),
        build_date: option_env!("BUILD_DATE").map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_is_valid_semver() {
        let info = build_info();
        assert!(
            info.semver().is_ok(),
            "version should be valid semver, got: {}",
            info.version
        );
    }

    #[test]
    fn test_build_date_is_stamped() {
        assert!(build_info().build_date.is_some());
    }
}
