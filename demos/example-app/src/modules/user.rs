use crate::infrastructure::database::{DATABASE, Database};
use axum::{Json, extract::Path, extract::State};
use meshestra_compiler::prelude::*;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

pub struct UserService {
    database: Arc<Database>,
}

impl Injectable for UserService {
    fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            database: injector.get::<Database>(&Token::new(DATABASE))?,
        })
    }
}

impl UserService {
    pub fn find_all(&self) -> Vec<User> {
        self.database
            .all()
            .into_iter()
            .map(|(id, name)| User { id, name })
            .collect()
    }

    pub fn find_one(&self, id: u64) -> Option<User> {
        self.database.find(id).map(|name| User { id, name })
    }
}

pub struct UserController {
    user_service: Arc<UserService>,
}

impl Injectable for UserController {
    fn inject(injector: &Injector<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            user_service: injector.resolve::<UserService>()?,
        })
    }
}

impl UserController {
    pub fn base_path() -> &'static str {
        "/users"
    }

    pub fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor::new::<UserController>(Self::base_path())
            .method(MethodDescriptor::handler("list"))
            .method(
                MethodDescriptor::handler("get_user")
                    .path("/{id}")
                    .middleware(MiddlewareItem::class::<RequestTimer>()),
            )
    }

    pub fn router(controller: Arc<Self>) -> Router {
        Router::new()
            .route("/", axum::routing::get(list))
            .route("/{id}", axum::routing::get(get_user))
            .with_state(controller)
    }
}

async fn list(State(controller): State<Arc<UserController>>) -> Json<Vec<User>> {
    Json(controller.user_service.find_all())
}

async fn get_user(
    State(controller): State<Arc<UserController>>,
    Path(id): Path<u64>,
) -> Result<Json<User>, StatusCode> {
    controller
        .user_service
        .find_one(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Logs every request under the module's controllers.
#[derive(Default)]
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        tracing::info!("{} {}", request.method(), request.uri());
        next.run(request).await
    }

    fn name(&self) -> &str {
        "RequestLogger"
    }
}

#[derive(Default)]
pub struct RequestTimer;

#[async_trait]
impl Middleware for RequestTimer {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let started = Instant::now();
        let response = next.run(request).await;
        tracing::debug!("Handled in {:?}", started.elapsed());
        response
    }

    fn name(&self) -> &str {
        "RequestTimer"
    }
}

pub struct UserModule;

impl UserModule {
    fn configure(&self, consumer: &mut MiddlewareConsumer) {
        let audit = MiddlewareItem::function("audit", |request: Request<Body>, next: Next| {
            async move {
                tracing::debug!(path = %request.uri().path(), "audit");
                next.run(request).await
            }
        });
        consumer
            .apply([audit])
            .exclude(["/users/health"])
            .for_routes([UserController::base_path()]);
    }
}

impl Module for UserModule {}

pub fn user_module() -> ModuleRef {
    ModuleDescriptor::builder("UserModule", || UserModule)
        .provider(ProviderDescriptor::class::<UserService>())
        .provider(ProviderDescriptor::middleware::<RequestLogger>())
        .controller(UserController::descriptor())
        .configure(|module, consumer| module.configure(consumer))
        .build()
}
