//! Contract ABIs
//!
//! Only the calls the engine makes: factory lookup, pair state, ERC-20
//! metadata and allowances, and the three router swap entry points.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use bastion_core::{SwapCall, SwapKind};

sol! {
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function token0() external view returns (address token);
        function token1() external view returns (address token);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IERC20 {
        function decimals() external view returns (uint8 value);
        function balanceOf(address owner) external view returns (uint256 balance);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool ok);
    }

    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);

        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);
    }
}

/// Calldata for a router swap, selecting the entry point from `call.kind`
pub fn encode_swap(call: &SwapCall) -> Vec<u8> {
    let deadline = U256::from(call.deadline);
    match call.kind {
        SwapKind::ExactTokensForTokens => IUniswapV2Router02::swapExactTokensForTokensCall {
            amountIn: call.amount_in,
            amountOutMin: call.amount_out_min,
            path: call.path.clone(),
            to: call.recipient,
            deadline,
        }
        .abi_encode(),
        SwapKind::ExactNativeForTokens => IUniswapV2Router02::swapExactETHForTokensCall {
            amountOutMin: call.amount_out_min,
            path: call.path.clone(),
            to: call.recipient,
            deadline,
        }
        .abi_encode(),
        SwapKind::ExactTokensForNative => IUniswapV2Router02::swapExactTokensForETHCall {
            amountIn: call.amount_in,
            amountOutMin: call.amount_out_min,
            path: call.path.clone(),
            to: call.recipient,
            deadline,
        }
        .abi_encode(),
    }
}

pub fn encode_approve(spender: Address, amount: U256) -> Vec<u8> {
    IERC20::approveCall { spender, amount }.abi_encode()
}
