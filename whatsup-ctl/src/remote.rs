use anyhow::{anyhow, Context};
use async_trait::async_trait;
use whatsup_api::{Comment, CommentId, CommentService, Error, NewComment, PostId, UserId};

/// Comment service reached over the backend's REST api
pub struct Remote {
    host: String,
    client: reqwest::Client,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeBody {
    user_id: UserId,
}

impl Remote {
    pub fn new(host: String) -> Remote {
        Remote {
            host,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/comments{}", self.host, path)
    }
}

async fn check(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.context("reading error response")?;
    match Error::parse(&body) {
        Ok(err) => Err(err.into()),
        Err(_) => Err(anyhow!("server answered with status {status}")),
    }
}

#[async_trait]
impl CommentService for Remote {
    async fn fetch(
        &mut self,
        post_owner: UserId,
        post: PostId,
        offset: usize,
    ) -> anyhow::Result<Vec<Comment>> {
        let resp = self
            .client
            .get(self.url(&format!("/{}", post.0)))
            .query(&[("owner", post_owner.0), ("offset", offset as i64)])
            .send()
            .await
            .with_context(|| format!("fetching comments of post {post:?}"))?;
        Ok(check(resp)
            .await?
            .json()
            .await
            .context("parsing comment list")?)
    }

    async fn create(&mut self, c: NewComment) -> anyhow::Result<Comment> {
        let resp = self
            .client
            .post(self.url(""))
            .json(&c)
            .send()
            .await
            .context("submitting comment")?;
        Ok(check(resp)
            .await?
            .json()
            .await
            .context("parsing created comment")?)
    }

    async fn exists(&mut self, c: CommentId) -> anyhow::Result<bool> {
        let resp = self
            .client
            .get(self.url(&format!("/{}/exists", c.0)))
            .send()
            .await
            .with_context(|| format!("checking existence of comment {c:?}"))?;
        Ok(check(resp)
            .await?
            .json()
            .await
            .context("parsing existence answer")?)
    }

    async fn like(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("/{}/like", c.0)))
            .json(&LikeBody { user_id: user })
            .send()
            .await
            .with_context(|| format!("liking comment {c:?}"))?;
        check(resp).await?;
        Ok(())
    }

    async fn unlike(&mut self, c: CommentId, user: UserId) -> anyhow::Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/{}/like", c.0)))
            .json(&LikeBody { user_id: user })
            .send()
            .await
            .with_context(|| format!("unliking comment {c:?}"))?;
        check(resp).await?;
        Ok(())
    }

    async fn delete(&mut self, c: CommentId) -> anyhow::Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/{}", c.0)))
            .send()
            .await
            .with_context(|| format!("deleting comment {c:?}"))?;
        check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let r = Remote::new(String::from("http://localhost:3000"));
        assert_eq!(r.url(""), "http://localhost:3000/api/comments");
        assert_eq!(r.url("/4/like"), "http://localhost:3000/api/comments/4/like");
    }

    fn response(status: u16, body: Vec<u8>) -> reqwest::Response {
        reqwest::Response::from(
            http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn check_passes_successes_through() {
        let resp = check(response(200, b"true".to_vec())).await.unwrap();
        assert!(resp.json::<bool>().await.unwrap());
    }

    #[tokio::test]
    async fn check_decodes_api_errors() {
        let err = check(response(404, Error::NotFound(CommentId(4)).contents()))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::NotFound(CommentId(4))));

        let err = check(response(403, Error::PermissionDenied.contents()))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::PermissionDenied));
    }

    #[tokio::test]
    async fn check_falls_back_to_status_on_unparseable_body() {
        let err = check(response(502, b"<html>Bad Gateway</html>".to_vec()))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<Error>().is_none());
        assert!(err.to_string().contains("502"), "got {err}");

        let err = check(response(500, Vec::new())).await.unwrap_err();
        assert!(err.to_string().contains("500"), "got {err}");
    }
}
