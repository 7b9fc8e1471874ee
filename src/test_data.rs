#[cfg(test)]
pub const WRITING_DRAFT: &str = r#"---
title: "Hello, World!"
description: ""
pubDate: "2026-02-01"
tags: ["rust", "notes"]
draft: true

by:
  role: coauthored
  name: "Jing"
  note: "Outline by owner"
source:
  kind: original
---
# Hello, World!

Conclusion first, details later.

![cover](cover.jpg)

See the [diagram](diagram.png), the [previous post](../older-post/) and [this section](#details).
"#;

#[cfg(test)]
pub const WRITING_PUBLISHED: &str = r#"---
title: "Already out"
pubDate: "2026-01-10T12:00:00+08:00"
tags: []
draft: false
---
Nothing to see.
"#;

#[cfg(test)]
pub const NOW_ENTRY: &str = r#"---
title: "Now: Yesterday: small wins"
description: "Wrapped up a few loose ends."
pubDate: "2026-02-02T00:00:03+08:00"
tags: ["now", "mood", "life"]
draft: false

by:
  role: assistant
  name: "Scribe"
  note: "Daily recap"
source:
  kind: original
---
![cover](cover.jpg)

In one line: Wrapped up a few loose ends.

> Yesterday felt like "small wins".
> Doing small things right saves future trouble.
"#;
