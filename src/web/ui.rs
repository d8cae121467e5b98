use axum::response::{Html, IntoResponse};

/// 首页：手写画布
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>手写数字识别</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            color: #333;
        }

        .container {
            background: white;
            border-radius: 20px;
            padding: 40px;
            box-shadow: 0 20px 60px rgba(0, 0, 0, 0.1);
            max-width: 720px;
            width: 90%;
            text-align: center;
        }

        h1 {
            color: #5a67d8;
            margin-bottom: 10px;
            font-size: 2.2em;
        }

        .subtitle {
            color: #666;
            margin-bottom: 24px;
        }

        .workspace {
            display: flex;
            gap: 32px;
            justify-content: center;
            flex-wrap: wrap;
        }

        canvas {
            border: 2px solid #cbd5e0;
            border-radius: 12px;
            background: white;
            cursor: crosshair;
            touch-action: none;
        }

        .buttons {
            margin-top: 16px;
            display: flex;
            gap: 12px;
            justify-content: center;
        }

        .btn {
            background: #5a67d8;
            color: white;
            border: none;
            padding: 10px 28px;
            border-radius: 25px;
            font-size: 1em;
            cursor: pointer;
        }

        .btn.secondary {
            background: #a0aec0;
        }

        .btn:disabled {
            opacity: 0.6;
            cursor: not-allowed;
        }

        .result {
            min-width: 240px;
            text-align: left;
        }

        .digit {
            font-size: 4em;
            font-weight: bold;
            color: #2d3748;
            text-align: center;
        }

        .confidence {
            text-align: center;
            color: #4a5568;
            margin-bottom: 16px;
        }

        .bar-row {
            display: flex;
            align-items: center;
            gap: 8px;
            margin: 4px 0;
            font-family: monospace;
        }

        .bar-track {
            flex: 1;
            height: 14px;
            background: #edf2f7;
            border-radius: 7px;
            overflow: hidden;
        }

        .bar-fill {
            height: 100%;
            background: #5a67d8;
            width: 0;
            transition: width 0.2s ease;
        }

        .bar-row.top .bar-fill {
            background: #38a169;
        }

        .error {
            color: #e53e3e;
            margin-top: 12px;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>手写数字识别</h1>
        <p class="subtitle">在画布上写一个 0-9 的数字，然后点击识别</p>

        <div class="workspace">
            <div>
                <canvas id="canvas" width="280" height="280"></canvas>
                <div class="buttons">
                    <button class="btn" id="predictBtn">识别</button>
                    <button class="btn secondary" id="clearBtn">清除</button>
                </div>
            </div>

            <div class="result">
                <div class="digit" id="digit">?</div>
                <div class="confidence" id="confidence">尚未识别</div>
                <div id="bars"></div>
                <div class="error" id="error"></div>
            </div>
        </div>
    </div>

    <script>
        const canvas = document.getElementById('canvas');
        const ctx = canvas.getContext('2d');
        const predictBtn = document.getElementById('predictBtn');
        const clearBtn = document.getElementById('clearBtn');
        const digitEl = document.getElementById('digit');
        const confidenceEl = document.getElementById('confidence');
        const barsEl = document.getElementById('bars');
        const errorEl = document.getElementById('error');

        let drawing = false;

        function resetCanvas() {
            ctx.fillStyle = 'white';
            ctx.fillRect(0, 0, canvas.width, canvas.height);
            ctx.strokeStyle = 'black';
            ctx.lineWidth = 18;
            ctx.lineCap = 'round';
            ctx.lineJoin = 'round';
        }

        function buildBars() {
            barsEl.innerHTML = '';
            for (let d = 0; d < 10; d++) {
                const row = document.createElement('div');
                row.className = 'bar-row';
                row.innerHTML = `<span>${d}</span><div class="bar-track"><div class="bar-fill"></div></div><span class="pct">0.0%</span>`;
                barsEl.appendChild(row);
            }
        }

        function position(e) {
            const rect = canvas.getBoundingClientRect();
            return { x: e.clientX - rect.left, y: e.clientY - rect.top };
        }

        canvas.addEventListener('pointerdown', (e) => {
            drawing = true;
            const p = position(e);
            ctx.beginPath();
            ctx.moveTo(p.x, p.y);
        });

        canvas.addEventListener('pointermove', (e) => {
            if (!drawing) return;
            const p = position(e);
            ctx.lineTo(p.x, p.y);
            ctx.stroke();
        });

        ['pointerup', 'pointerleave'].forEach((name) =>
            canvas.addEventListener(name, () => { drawing = false; })
        );

        clearBtn.addEventListener('click', () => {
            resetCanvas();
            buildBars();
            digitEl.textContent = '?';
            confidenceEl.textContent = '尚未识别';
            errorEl.textContent = '';
        });

        predictBtn.addEventListener('click', async () => {
            predictBtn.disabled = true;
            errorEl.textContent = '';

            try {
                const response = await fetch('/predict', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ image: canvas.toDataURL('image/png') })
                });
                const data = await response.json();

                if (!response.ok) {
                    throw new Error(data.error || '识别失败');
                }
                displayResult(data);
            } catch (err) {
                errorEl.textContent = '错误: ' + err.message;
            } finally {
                predictBtn.disabled = false;
            }
        });

        function displayResult(data) {
            digitEl.textContent = data.digit;
            confidenceEl.textContent = `置信度 ${data.confidence.toFixed(1)}%`;

            const rows = barsEl.querySelectorAll('.bar-row');
            data.probabilities.forEach((p, d) => {
                const row = rows[d];
                row.classList.toggle('top', d === data.digit);
                row.querySelector('.bar-fill').style.width = `${p}%`;
                row.querySelector('.pct').textContent = `${p.toFixed(1)}%`;
            });
        }

        resetCanvas();
        buildBars();
    </script>
</body>
</html>
"#;
