use chrono::{DateTime, Local};

use super::layout;
use crate::policy::MOCK_USERNAME;

pub fn render_dashboard(last_login: DateTime<Local>) -> String {
    let body = format!(
        r#"<main class="page">
<header class="dashboard-header">
<div class="title">
<div class="icon-badge icon-success">&#10003;</div>
<div>
<h1>Dashboard</h1>
<p class="muted">Bem-vindo ao sistema</p>
</div>
</div>
<form method="post" action="/logout">
<button type="submit" class="btn btn-outline" data-cy="logout-button">Sair</button>
</form>
</header>
<div class="grid">
<section class="card">
<h3>Perfil</h3>
<p class="muted">Gerenciar informações do usuário e configurações de conta.</p>
<button type="button" class="btn btn-outline" data-cy="profile-button">Ver Perfil</button>
</section>
<section class="card">
<h3>Segurança</h3>
<p class="muted">Configurações de segurança e histórico de acesso.</p>
<button type="button" class="btn btn-outline" data-cy="security-button">Configurações</button>
</section>
<section class="card card-center">
<div class="icon-badge icon-primary">&#10003;</div>
<h3>Login Realizado</h3>
<p class="muted">Você foi autenticado com sucesso no sistema.</p>
</section>
</div>
<section class="card">
<h3>Informações do Sistema</h3>
<div class="grid grid-info">
<div><p class="muted">Status</p><p class="text-success">Online</p></div>
<div><p class="muted">Último Login</p><p>{last_login}</p></div>
<div><p class="muted">Usuário</p><p>{username}</p></div>
</div>
</section>
</main>"#,
        last_login = last_login.format("%d/%m/%Y, %H:%M:%S"),
        username = MOCK_USERNAME,
    );

    layout("Dashboard", &body, None)
}
