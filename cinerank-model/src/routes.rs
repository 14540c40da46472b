macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions shared by the server and its clients
pub mod v1 {
    pub const ROOT: &str = "/api/v1";

    pub mod movies {
        pub const RATE: &str = v1_path!("/movies/rate");
    }

    pub mod rankings {
        pub const PLACEMENT: &str = v1_path!("/rankings/placement");
        pub const PLACEMENT_SESSION: &str =
            v1_path!("/rankings/placement/{session_id}");
        pub const PLACEMENT_DECISION: &str =
            v1_path!("/rankings/placement/{session_id}/decision");
        pub const INITIAL: &str = v1_path!("/rankings/initial");
        pub const ORDERED: &str = v1_path!("/rankings/ordered");
        pub const STATE: &str = v1_path!("/rankings/state");
    }
}

pub const HEALTH: &str = "/health";

pub mod utils {
    /// Replace a single path parameter (e.g. `"{session_id}"`) with the
    /// provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }

    /// Strip the version prefix so a route can be registered on a router
    /// nested under [`super::v1::ROOT`].
    pub fn relative(route: &str) -> &str {
        route.strip_prefix(super::v1::ROOT).unwrap_or(route)
    }
}
