//! OpenAPI documentation for the management API at `/api/v1/*`.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::{posts, threads, users};
use crate::db::models::posts::{MediaKind, MediaRef, PostStatus};
use crate::errors::DeniedBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crosscast API",
        description = "Cross-posts a user's tweets to Farcaster. Tweets are ingested into a \
                       review queue, grouped into threads, and published as reply chains once \
                       the user approves them. Publishing is gated by per-user free-cast \
                       quotas, balances and spending limits.",
    ),
    servers((url = "/api/v1")),
    paths(
        api::handlers::users::create_or_get_user,
        api::handlers::users::get_user,
        api::handlers::users::update_spending,
        api::handlers::users::claim_promo,
        api::handlers::posts::ingest,
        api::handlers::posts::reject_post,
        api::handlers::posts::restore_posts,
        api::handlers::posts::edit_post,
        api::handlers::threads::get_thread,
        api::handlers::threads::approve_thread,
    ),
    components(schemas(
        users::UserCreate,
        users::SpendingUpdate,
        users::UserResponse,
        users::PromoResponse,
        posts::PostResponse,
        posts::PostEdit,
        posts::IngestResponse,
        posts::RejectResponse,
        posts::RestoreResponse,
        threads::ThreadResponse,
        threads::ApproveResponse,
        PostStatus,
        MediaRef,
        MediaKind,
        DeniedBody,
    )),
    tags(
        (name = "users", description = "Accounts, spending controls and the promotional cast"),
        (name = "posts", description = "Tweet ingestion and per-post review actions"),
        (name = "threads", description = "Thread preview and approval"),
    )
)]
pub struct ApiDoc;
