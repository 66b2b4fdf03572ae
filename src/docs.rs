use utoipa::OpenApi;
use crate::modules::comic::dto::*;
use crate::modules::comic::model::{ComicStatus, Panel};

#[derive(OpenApi)]
#[openapi(
    info(title = "AI Comic Creator API"),
    paths(
        crate::modules::comic::handler::start_generation,
        crate::modules::comic::handler::check_status,
        crate::modules::comic::handler::list_comics,
        crate::modules::comic::handler::serve_file,
    ),
    components(
        schemas(
            StoryPrompt, ComicProgress, ComicStatus, Panel,
        )
    ),
    tags(
        (name = "Comics", description = "Comic generation jobs and their artifacts")
    )
)]
pub struct ApiDoc;
